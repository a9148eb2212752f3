//! TCP 전송 엔진
//!
//! 요청 라인은 개행으로 끝나는 십진 ASCII 크기 (예: `"4194304\n"`).
//! 서버는 그 크기만큼 필러 바이트를 쓰고 연결을 닫는다.
//! 클라이언트는 피어가 닫거나 기대 바이트에 도달할 때까지 읽는다.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Instant;

use tracing::{info, warn};

use crate::stats::TransferRecord;
use crate::{Config, Error, Result};

/// TCP 필러 바이트
const FILLER: u8 = b'A';

/// 요청 라인 최대 길이 (u64 십진수 + 개행이면 충분)
const MAX_REQUEST_LINE: usize = 64;

/// 수락된 연결 1건 처리 (서버측)
///
/// 잘못된 요청 라인이면 아무 응답 없이 연결을 닫는다.
/// 에러는 이 연결에만 격리된다.
pub fn handle_client(mut stream: TcpStream, config: &Config) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());

    match serve_stream(&mut stream, config) {
        Ok(file_size) => info!("TCP transfer to {} complete ({} bytes)", peer, file_size),
        Err(e) => warn!("TCP connection from {} failed: {}", peer, e),
    }
}

/// 요청 라인을 읽고 해당 크기의 필러를 스트림에 쓴다
fn serve_stream(stream: &mut TcpStream, config: &Config) -> Result<u64> {
    let file_size = read_request_line(stream)?;
    info!("TCP request for {} bytes", file_size);

    let chunk = vec![FILLER; config.segment_size];
    let mut sent = 0u64;
    while sent < file_size {
        let len = (file_size - sent).min(config.segment_size as u64) as usize;
        stream.write_all(&chunk[..len])?;
        sent += len as u64;
    }
    Ok(file_size)
}

/// 개행으로 끝나는 십진 크기 라인 파싱
///
/// 개행 없이 라인 한도를 넘거나 숫자가 아니면 `InvalidRequestLine`.
/// 개행 이후 바이트는 소비하지 않는다.
fn read_request_line(stream: &mut TcpStream) -> Result<u64> {
    let mut line = Vec::with_capacity(MAX_REQUEST_LINE);
    let mut byte = [0u8; 1];

    loop {
        let n = stream.read(&mut byte)?;
        if n == 0 || byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
        if line.len() >= MAX_REQUEST_LINE {
            break;
        }
    }

    let text = String::from_utf8_lossy(&line);
    let text = text.trim();
    text.parse()
        .map_err(|_| Error::InvalidRequestLine(text.to_string()))
}

/// TCP 다운로드 1회 수행 (클라이언트측)
///
/// `file_size = 0`이면 즉시 완료된다 (0바이트, 유한한 경과 시간).
pub fn download(
    server: SocketAddr,
    file_size: u64,
    connection_id: u32,
    config: &Config,
) -> Result<TransferRecord> {
    let mut stream = TcpStream::connect(server)?;
    stream.write_all(format!("{}\n", file_size).as_bytes())?;

    let start = Instant::now();
    let mut buf = vec![0u8; config.segment_size];
    let mut received = 0u64;

    while received < file_size {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            // 피어가 연결을 닫음
            break;
        }
        received += n as u64;
    }

    let elapsed = start.elapsed();
    let record = TransferRecord::tcp(connection_id, received, elapsed);
    info!("TCP transfer #{} complete: {}", connection_id, record.summary());
    Ok(record)
}
