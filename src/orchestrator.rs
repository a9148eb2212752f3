//! 전송 오케스트레이터 (클라이언트측)
//!
//! 요청된 수만큼 TCP/UDP 엔진 인스턴스를 각자의 스레드에서 동시에
//! 실행하고, 전부 끝난 뒤 집계 보고서를 만든다. 인스턴스 실패는
//! 해당 레코드가 빠질 뿐 다른 인스턴스를 중단시키지 않는다.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::warn;

use crate::discover::ServerOffer;
use crate::stats::{TransferRecord, TransferReport};
use crate::{tcp, udp, Config};

/// TCP/UDP 전송을 동시에 실행하고 보고서 반환
///
/// 연결 ID는 프로토콜별로 1..=N을 부여한다. 성공한 인스턴스는
/// 공유 수집기에 레코드를 정확히 1개 append한다.
pub fn run_transfers(
    server: &ServerOffer,
    file_size: u64,
    tcp_connections: u32,
    udp_connections: u32,
    config: &Config,
) -> TransferReport {
    // 인스턴스 간 유일한 공유 상태: append 전용 레코드 수집기
    let sink: Arc<Mutex<Vec<TransferRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::with_capacity((tcp_connections + udp_connections) as usize);

    for id in 1..=tcp_connections {
        let sink = sink.clone();
        let config = config.clone();
        let addr = server.tcp_addr();
        handles.push(thread::spawn(move || {
            match tcp::download(addr, file_size, id, &config) {
                Ok(record) => sink.lock().push(record),
                Err(e) => warn!("TCP transfer #{} failed: {}", id, e),
            }
        }));
    }

    for id in 1..=udp_connections {
        let sink = sink.clone();
        let config = config.clone();
        let addr = server.udp_addr();
        handles.push(thread::spawn(move || {
            match udp::download(addr, file_size, id, &config) {
                Ok(record) => sink.lock().push(record),
                Err(e) => warn!("UDP transfer #{} failed: {}", id, e),
            }
        }));
    }

    for handle in handles {
        // 전송 스레드 패닉도 레코드 누락으로만 취급
        if handle.join().is_err() {
            warn!("transfer thread panicked");
        }
    }

    let records = Arc::try_unwrap(sink)
        .map(Mutex::into_inner)
        .unwrap_or_default();
    TransferReport::new(records)
}
