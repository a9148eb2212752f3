//! 전송 통계
//!
//! 엔진 인스턴스당 `TransferRecord` 1개가 완료 시점에 생성되어
//! 공유 수집기에 append되고, 이후 절대 수정되지 않는다.

use std::fmt;
use std::time::Duration;

/// 전송 프로토콜 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// 연결 1개의 전송 결과 레코드
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    /// 호출자가 부여한 연결 ID (프로토콜별 1..N)
    pub connection_id: u32,

    /// 프로토콜
    pub protocol: Protocol,

    /// 수신 바이트
    pub bytes_received: u64,

    /// 경과 시간
    pub elapsed: Duration,

    /// 달성 비트레이트 (bits/sec, 경과 시간 0이면 0)
    pub bits_per_second: f64,

    /// 기대 패킷 수 (UDP 전용)
    pub packets_expected: Option<u64>,

    /// 수신 패킷 수 (UDP 전용, 중복 인덱스 제외)
    pub packets_received: Option<u64>,

    /// 전달률 0.0 ~ 1.0 (UDP 전용)
    pub delivery_ratio: Option<f64>,
}

impl TransferRecord {
    /// TCP 전송 레코드 생성
    pub fn tcp(connection_id: u32, bytes_received: u64, elapsed: Duration) -> Self {
        Self {
            connection_id,
            protocol: Protocol::Tcp,
            bytes_received,
            elapsed,
            bits_per_second: bits_per_second(bytes_received, elapsed),
            packets_expected: None,
            packets_received: None,
            delivery_ratio: None,
        }
    }

    /// UDP 전송 레코드 생성
    pub fn udp(
        connection_id: u32,
        bytes_received: u64,
        elapsed: Duration,
        packets_expected: u64,
        packets_received: u64,
    ) -> Self {
        let delivery_ratio = if packets_expected > 0 {
            packets_received as f64 / packets_expected as f64
        } else {
            0.0
        };

        Self {
            connection_id,
            protocol: Protocol::Udp,
            bytes_received,
            elapsed,
            bits_per_second: bits_per_second(bytes_received, elapsed),
            packets_expected: Some(packets_expected),
            packets_received: Some(packets_received),
            delivery_ratio: Some(delivery_ratio),
        }
    }

    /// 한 줄 요약 문자열
    pub fn summary(&self) -> String {
        match self.protocol {
            Protocol::Tcp => format!(
                "TCP #{}: {} bytes in {:.3}s at {:.0} bits/sec",
                self.connection_id,
                self.bytes_received,
                self.elapsed.as_secs_f64(),
                self.bits_per_second,
            ),
            Protocol::Udp => format!(
                "UDP #{}: {}/{} packets ({:.1}%) in {:.3}s at {:.0} bits/sec",
                self.connection_id,
                self.packets_received.unwrap_or(0),
                self.packets_expected.unwrap_or(0),
                self.delivery_ratio.unwrap_or(0.0) * 100.0,
                self.elapsed.as_secs_f64(),
                self.bits_per_second,
            ),
        }
    }
}

/// 전체 전송 보고서
///
/// 오케스트레이터가 모든 인스턴스가 끝난 뒤 한 번 생성한다.
#[derive(Debug, Clone, Default)]
pub struct TransferReport {
    /// 완료된 연결별 레코드
    pub records: Vec<TransferRecord>,
}

impl TransferReport {
    pub fn new(records: Vec<TransferRecord>) -> Self {
        Self { records }
    }

    /// 프로토콜별 레코드 수
    pub fn count(&self, protocol: Protocol) -> usize {
        self.records
            .iter()
            .filter(|r| r.protocol == protocol)
            .count()
    }

    /// 프로토콜별 합산 비트레이트 (bits/sec)
    pub fn aggregate_bits_per_second(&self, protocol: Protocol) -> f64 {
        self.records
            .iter()
            .filter(|r| r.protocol == protocol)
            .map(|r| r.bits_per_second)
            .sum()
    }

    /// UDP 평균 전달률 (UDP 레코드가 없으면 0)
    pub fn average_delivery_ratio(&self) -> f64 {
        let ratios: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.delivery_ratio)
            .collect();

        if ratios.is_empty() {
            return 0.0;
        }
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "TCP: {} transfers, {:.2} Mbit/s total | UDP: {} transfers, {:.2} Mbit/s total, {:.1}% avg delivery",
            self.count(Protocol::Tcp),
            self.aggregate_bits_per_second(Protocol::Tcp) / 1_000_000.0,
            self.count(Protocol::Udp),
            self.aggregate_bits_per_second(Protocol::Udp) / 1_000_000.0,
            self.average_delivery_ratio() * 100.0,
        )
    }
}

/// 비트레이트 계산 (경과 시간 0이면 0)
fn bits_per_second(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    bytes as f64 * 8.0 / secs
}
