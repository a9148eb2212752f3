//! # NSP (Network Speedtest Protocol)
//!
//! 브로드캐스트 탐색 기반 TCP/UDP 처리량 벤치마크 프로토콜
//!
//! ## 핵심 특징
//! - **브로드캐스트 탐색**: 서버가 매초 Offer를 송출, 클라이언트는 첫 Offer만 소비
//! - **이중 전송 경로**: TCP 스트림과 UDP 세그먼트 전송을 동시에 측정
//! - **Fire-and-forget**: 재전송 없음, 손실 세그먼트는 전달률 하락으로만 드러남
//! - **스레드 단위 동시성**: 연결/요청당 스레드 1개, 이벤트 루프 없음
//! - **Append 전용 통계**: 인스턴스당 불변 레코드 1개, 뮤텍스 보호 수집기

pub mod config;
pub mod discover;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod server;
pub mod stats;
pub mod tcp;
pub mod udp;

pub use config::Config;
pub use discover::ServerOffer;
pub use error::{Error, Result};
pub use message::{Offer, PayloadHeader, Request};
pub use orchestrator::run_transfers;
pub use server::Server;
pub use stats::{Protocol, TransferRecord, TransferReport};

/// 매직 쿠키 (패킷 식별용)
pub const MAGIC_COOKIE: u32 = 0xABCD_DCBA;

/// 기본 세그먼트 크기 (바이트, TCP 청크 크기 겸용)
pub const DEFAULT_SEGMENT_SIZE: usize = 1024;
