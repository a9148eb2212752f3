//! 프로토콜 설정

use std::time::Duration;

use crate::DEFAULT_SEGMENT_SIZE;

/// 기본 브로드캐스트 포트 (Offer 송수신 전용)
pub const DEFAULT_BROADCAST_PORT: u16 = 12345;

/// 기본 UDP 데이터 포트
pub const DEFAULT_UDP_PORT: u16 = 15000;

/// 기본 TCP 데이터 포트
pub const DEFAULT_TCP_PORT: u16 = 16000;

/// NSP 프로토콜 설정
///
/// 시작 시 한 번 구성해 각 컴포넌트에 명시적으로 전달한다.
/// 전역 가변 상태 없음.
#[derive(Debug, Clone)]
pub struct Config {
    /// Offer 브로드캐스트 포트 (데이터 포트와 분리)
    pub broadcast_port: u16,

    /// UDP 데이터 요청 포트 (0이면 자동 할당)
    pub udp_port: u16,

    /// TCP 데이터 연결 포트 (0이면 자동 할당)
    pub tcp_port: u16,

    /// 세그먼트 크기 (바이트, TCP 쓰기 청크 크기 겸용)
    pub segment_size: usize,

    /// Offer 송출 간격
    pub broadcast_interval: Duration,

    /// Offer 대기 전체 타임아웃
    pub discovery_timeout: Duration,

    /// UDP 패킷 단위 수신 타임아웃 (전송 종료/정체 판정)
    pub udp_recv_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broadcast_port: DEFAULT_BROADCAST_PORT,
            udp_port: DEFAULT_UDP_PORT,
            tcp_port: DEFAULT_TCP_PORT,
            segment_size: DEFAULT_SEGMENT_SIZE,
            broadcast_interval: Duration::from_secs(1),
            discovery_timeout: Duration::from_secs(20),
            udp_recv_timeout: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// 환경 변수 오버라이드 적용
    ///
    /// `NSP_BROADCAST_PORT`, `NSP_UDP_PORT`, `NSP_TCP_PORT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = env_port("NSP_BROADCAST_PORT") {
            config.broadcast_port = port;
        }
        if let Some(port) = env_port("NSP_UDP_PORT") {
            config.udp_port = port;
        }
        if let Some(port) = env_port("NSP_TCP_PORT") {
            config.tcp_port = port;
        }
        config
    }
}

fn env_port(key: &str) -> Option<u16> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
