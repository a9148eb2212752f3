//! 와이어 메시지 정의
//!
//! 고정 포맷 메시지 3종 (Offer / Request / Payload 헤더).
//! 모든 다중 바이트 정수는 빅엔디안 (네트워크 바이트 오더).
//!
//! 디코딩 실패는 호출자가 해당 패킷을 외부 트래픽으로 간주해 버리는
//! 신호일 뿐, 연결이나 루프를 중단시키지 않는다.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::MAGIC_COOKIE;

/// Offer 메시지 길이 (바이트)
pub const OFFER_LEN: usize = 9;

/// Request 메시지 길이 (바이트)
pub const REQUEST_LEN: usize = 13;

/// Payload 헤더 길이 (바이트)
pub const PAYLOAD_HEADER_LEN: usize = 21;

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// 서버 공지 (브로드캐스트)
    Offer = 0x2,

    /// 전송 요청 (클라이언트 -> 서버)
    Request = 0x3,

    /// 데이터 세그먼트 (서버 -> 클라이언트)
    Payload = 0x4,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x2 => Ok(MessageType::Offer),
            0x3 => Ok(MessageType::Request),
            0x4 => Ok(MessageType::Payload),
            other => Err(Error::UnknownMessageType { got: other }),
        }
    }
}

/// 공통 헤더 디코딩: 매직 쿠키와 메시지 타입 검증
///
/// 길이 검증은 메시지별 `from_bytes`가 먼저 수행한다.
fn decode_header(buf: &mut &[u8], expected: MessageType) -> Result<()> {
    let magic = buf.get_u32();
    if magic != MAGIC_COOKIE {
        return Err(Error::InvalidMagicNumber {
            expected: MAGIC_COOKIE,
            got: magic,
        });
    }

    let raw_type = buf.get_u8();
    if MessageType::from_u8(raw_type)? != expected {
        return Err(Error::UnknownMessageType { got: raw_type });
    }
    Ok(())
}

fn encode_header(buf: &mut BytesMut, msg_type: MessageType) {
    buf.put_u32(MAGIC_COOKIE);
    buf.put_u8(msg_type as u8);
}

/// 서버 공지 메시지
///
/// 서버가 브로드캐스트 주기마다 한 번 송출하고, 클라이언트는
/// 첫 번째 유효한 Offer만 소비한다. 단일 패킷 이상의 수명 없음.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    /// 공지하는 UDP 데이터 포트
    pub udp_port: u16,

    /// 공지하는 TCP 데이터 포트
    pub tcp_port: u16,
}

impl Offer {
    pub fn new(udp_port: u16, tcp_port: u16) -> Self {
        Self { udp_port, tcp_port }
    }

    /// 바이트로 직렬화 (9바이트 고정)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(OFFER_LEN);
        encode_header(&mut buf, MessageType::Offer);
        buf.put_u16(self.udp_port);
        buf.put_u16(self.tcp_port);
        buf.to_vec()
    }

    /// 바이트에서 역직렬화
    ///
    /// 앞뒤에 바이트가 더 붙어 있으면 고정 폭 정렬이 깨진 것이므로
    /// 정확히 9바이트만 허용한다.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != OFFER_LEN {
            return Err(Error::MalformedMessage {
                expected: OFFER_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = bytes;
        decode_header(&mut buf, MessageType::Offer)?;
        Ok(Self {
            udp_port: buf.get_u16(),
            tcp_port: buf.get_u16(),
        })
    }
}

/// 전송 요청 메시지
///
/// UDP 전송 시도당 한 번 송신되고, 서버측 세그먼트 분할 1회와
/// 정확히 대응한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// 요청 파일 크기 (바이트)
    pub file_size: u64,
}

impl Request {
    pub fn new(file_size: u64) -> Self {
        Self { file_size }
    }

    /// 바이트로 직렬화 (13바이트 고정)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(REQUEST_LEN);
        encode_header(&mut buf, MessageType::Request);
        buf.put_u64(self.file_size);
        buf.to_vec()
    }

    /// 바이트에서 역직렬화 (정확히 13바이트만 허용)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != REQUEST_LEN {
            return Err(Error::MalformedMessage {
                expected: REQUEST_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = bytes;
        decode_header(&mut buf, MessageType::Request)?;
        Ok(Self {
            file_size: buf.get_u64(),
        })
    }
}

/// 데이터 세그먼트 헤더
///
/// 헤더 뒤에 세그먼트 크기 이하의 필러 데이터가 이어진다.
/// 필러 내용은 의미가 없고 길이만 처리량 계산에 쓰인다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// 이 전송의 총 세그먼트 수
    pub total_segments: u64,

    /// 세그먼트 인덱스 (`0..total_segments`, 도착 순서 보장 없음)
    pub segment_index: u64,
}

impl PayloadHeader {
    pub fn new(total_segments: u64, segment_index: u64) -> Self {
        Self {
            total_segments,
            segment_index,
        }
    }

    /// 헤더를 바이트로 직렬화 (21바이트, 필러 제외)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(PAYLOAD_HEADER_LEN);
        encode_header(&mut buf, MessageType::Payload);
        buf.put_u64(self.total_segments);
        buf.put_u64(self.segment_index);
        buf.to_vec()
    }

    /// 바이트에서 역직렬화 (헤더 이후 필러는 무시)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PAYLOAD_HEADER_LEN {
            return Err(Error::MalformedMessage {
                expected: PAYLOAD_HEADER_LEN,
                got: bytes.len(),
            });
        }

        let mut buf = bytes;
        decode_header(&mut buf, MessageType::Payload)?;
        Ok(Self {
            total_segments: buf.get_u64(),
            segment_index: buf.get_u64(),
        })
    }
}

/// Payload 데이터그램 디코딩: 헤더와 필러 데이터 분리
pub fn decode_payload(bytes: &[u8]) -> Result<(PayloadHeader, &[u8])> {
    let header = PayloadHeader::from_bytes(bytes)?;
    Ok((header, &bytes[PAYLOAD_HEADER_LEN..]))
}
