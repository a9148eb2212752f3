//! UDP 전송 엔진
//!
//! - 서버: Request 1건당 파일을 고정 크기 세그먼트로 쪼개 Payload로 송신
//! - 클라이언트: Request 1건 송신 후 Payload를 수집해 전달률 계산
//!
//! Fire-and-forget: 재전송도 페이싱도 없다. 손실 세그먼트는
//! 수신측 전달률 하락으로만 드러난다.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::message::{self, PayloadHeader, Request, PAYLOAD_HEADER_LEN};
use crate::stats::TransferRecord;
use crate::{Config, Result};

/// UDP 필러 바이트
const FILLER: u8 = b'B';

/// 파일 크기에 필요한 총 세그먼트 수 (`ceil(file_size / segment_size)`)
///
/// `file_size`는 와이어에서 오는 값이라 u64 전 범위에서 오버플로 없이 동작해야 한다.
pub fn total_segments(file_size: u64, segment_size: usize) -> u64 {
    file_size.div_ceil(segment_size as u64)
}

/// `(segment_index, 길이)` 이터레이터
///
/// 마지막 세그먼트만 짧을 수 있고, 길이 합은 항상 `file_size`와 같다.
pub fn segment_lengths(
    file_size: u64,
    segment_size: usize,
) -> impl Iterator<Item = (u64, usize)> {
    let total = total_segments(file_size, segment_size);
    let segment_size = segment_size as u64;
    (0..total).map(move |index| {
        let remaining = file_size - index * segment_size;
        (index, remaining.min(segment_size) as usize)
    })
}

/// 수신한 Request 데이터그램 1건 처리 (서버측)
///
/// 검증 실패 시 응답 없이 버린다. 미인증 피어에게 거부를 알릴
/// 신뢰할 방법이 없기 때문에 로그만 남긴다.
pub fn handle_request(datagram: &[u8], peer: SocketAddr, config: &Config) {
    let request = match Request::from_bytes(datagram) {
        Ok(request) => request,
        Err(e) => {
            warn!("invalid UDP request from {}: {}", peer, e);
            return;
        }
    };

    if let Err(e) = send_segments(request.file_size, peer, config) {
        warn!("UDP transfer to {} failed: {}", peer, e);
    }
}

/// 파일을 세그먼트로 쪼개 Payload 데이터그램으로 인덱스 오름차순 송신
fn send_segments(file_size: u64, peer: SocketAddr, config: &Config) -> Result<()> {
    // 요청마다 독립 소켓: 동시 요청자 간 공유 상태 없음
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    let total = total_segments(file_size, config.segment_size);

    info!(
        "UDP request from {}: {} bytes, {} segments",
        peer, file_size, total
    );

    for (index, len) in segment_lengths(file_size, config.segment_size) {
        let mut datagram = PayloadHeader::new(total, index).to_bytes();
        datagram.resize(PAYLOAD_HEADER_LEN + len, FILLER);
        socket.send_to(&datagram, peer)?;
    }

    info!("UDP transfer to {} complete ({} segments)", peer, total);
    Ok(())
}

/// 수신 루프 상태
///
/// 첫 유효 Payload가 `total_segments`를 확정하고, 수신 타임아웃은
/// 어느 상태에서든 "전송 종료/정체"로 해석된다.
#[derive(Debug)]
enum RecvState {
    /// 첫 유효 Payload 대기
    WaitingForFirst,

    /// 수신 중 (인덱스별 수신 여부 비트맵 유지)
    Receiving { total: u64, seen: Vec<bool> },

    /// 모든 세그먼트 수신 완료
    Done,

    /// 타임아웃으로 종료 (정체 또는 손실)
    Stalled,
}

impl RecvState {
    fn is_terminal(&self) -> bool {
        matches!(self, RecvState::Done | RecvState::Stalled)
    }
}

/// UDP 다운로드 1회 수행 (클라이언트측)
///
/// 기대 패킷 수는 요청한 크기에서 독립적으로 계산한다. 손실이 없으면
/// 서버의 total_segments와 일치하고, 불일치는 보정 없이 전달률에만 반영된다.
pub fn download(
    server: SocketAddr,
    file_size: u64,
    connection_id: u32,
    config: &Config,
) -> Result<TransferRecord> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_read_timeout(Some(config.udp_recv_timeout))?;

    socket.send_to(&Request::new(file_size).to_bytes(), server)?;

    let expected = total_segments(file_size, config.segment_size);
    let start = Instant::now();

    let mut received_packets = 0u64;
    let mut received_bytes = 0u64;
    let mut buf = vec![0u8; PAYLOAD_HEADER_LEN + config.segment_size];

    let mut state = if expected == 0 {
        RecvState::Done
    } else {
        RecvState::WaitingForFirst
    };

    while !state.is_terminal() {
        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                state = RecvState::Stalled;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let (header, data) = match message::decode_payload(&buf[..len]) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("ignoring datagram: {}", e);
                continue;
            }
        };

        if matches!(state, RecvState::WaitingForFirst) {
            // 첫 헤더의 total이 독립 계산한 기대치를 넘으면 위조/손상으로
            // 보고 버린다. 비트맵 할당 크기가 기대치로 한정된다.
            if header.total_segments > expected {
                debug!(
                    "ignoring payload header claiming {} segments (expected {})",
                    header.total_segments, expected
                );
                continue;
            }
            state = RecvState::Receiving {
                total: header.total_segments,
                seen: vec![false; header.total_segments as usize],
            };
        }

        let mut complete = false;
        if let RecvState::Receiving { total, seen } = &mut state {
            let index = header.segment_index as usize;

            // 범위 밖/중복 인덱스는 집계하지 않는다
            if index >= seen.len() || seen[index] {
                continue;
            }
            seen[index] = true;
            received_packets += 1;
            received_bytes += data.len() as u64;
            complete = received_packets >= *total;
        }
        if complete {
            state = RecvState::Done;
        }
    }

    let elapsed = start.elapsed();
    let record = TransferRecord::udp(
        connection_id,
        received_bytes,
        elapsed,
        expected,
        received_packets,
    );

    info!(
        "UDP transfer #{} {}: {}",
        connection_id,
        match state {
            RecvState::Stalled => "stalled",
            _ => "complete",
        },
        record.summary()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_segments() {
        assert_eq!(total_segments(0, 1024), 0);
        assert_eq!(total_segments(1, 1024), 1);
        assert_eq!(total_segments(1024, 1024), 1);
        assert_eq!(total_segments(1025, 1024), 2);
        assert_eq!(total_segments(10000, 1024), 10);
        // 와이어 최대값에서도 오버플로 없이 올림 나눗셈이 성립해야 한다
        assert_eq!(total_segments(u64::MAX, 1024), 1 << 54);
    }

    #[test]
    fn test_segment_lengths_10000() {
        let segments: Vec<(u64, usize)> = segment_lengths(10000, 1024).collect();

        assert_eq!(segments.len(), 10);
        for (index, len) in &segments[..9] {
            assert!(*index < 9);
            assert_eq!(*len, 1024);
        }
        assert_eq!(segments[9], (9, 784));
    }

    #[test]
    fn test_segment_lengths_sum_to_file_size() {
        for file_size in [0u64, 1, 783, 1024, 1025, 10000, 4 * 1024 * 1024 + 3] {
            let sum: u64 = segment_lengths(file_size, 1024)
                .map(|(_, len)| len as u64)
                .sum();
            assert_eq!(sum, file_size);
        }
    }

    #[test]
    fn test_segment_lengths_evenly_divisible() {
        let segments: Vec<(u64, usize)> = segment_lengths(2048, 1024).collect();
        assert_eq!(segments, vec![(0, 1024), (1, 1024)]);
    }
}
