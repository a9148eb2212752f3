//! 서버 탐색
//!
//! - 서버: Offer 메시지를 브로드캐스트 주소로 주기 송출
//! - 클라이언트: 첫 번째 유효한 Offer를 수신할 때까지 대기
//!
//! 브로드캐스트 채널은 데이터 포트와 분리된 전용 포트를 쓴다.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::message::Offer;
use crate::{Config, Error, Result};

/// 탐색으로 얻은 서버 정보
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOffer {
    /// 서버 주소 (Offer 송신자)
    pub addr: IpAddr,

    /// 공지된 UDP 데이터 포트
    pub udp_port: u16,

    /// 공지된 TCP 데이터 포트
    pub tcp_port: u16,
}

impl ServerOffer {
    /// UDP 데이터 소켓 주소
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.udp_port)
    }

    /// TCP 데이터 소켓 주소
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.tcp_port)
    }
}

/// Offer 브로드캐스트 루프 (서버측)
///
/// 매 주기마다 데이터 포트를 공지하는 Offer 데이터그램 1개를
/// `255.255.255.255:broadcast_port`로 보낸다. 송신 실패는 일시적
/// 네트워크 장애일 수 있으므로 로그만 남기고 다음 주기에 계속한다.
/// 소켓 준비 실패 외에는 반환하지 않는다.
pub fn run_broadcaster(config: &Config, udp_port: u16, tcp_port: u16) -> Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_broadcast(true)?;

    let offer = Offer::new(udp_port, tcp_port).to_bytes();
    let target = SocketAddr::from((Ipv4Addr::BROADCAST, config.broadcast_port));

    info!(
        "UDP offer broadcast started (every {:?}, udp={} tcp={})",
        config.broadcast_interval, udp_port, tcp_port
    );

    loop {
        if let Err(e) = socket.send_to(&offer, target) {
            warn!("offer broadcast failed: {}", e);
        }
        std::thread::sleep(config.broadcast_interval);
    }
}

/// 첫 번째 유효한 Offer를 기다린다 (클라이언트측)
///
/// `discovery_timeout` 안에 유효한 Offer가 없으면 `NoServerFound`.
/// 이는 정상적인 결과이지 프로세스를 중단시킬 에러가 아니다.
/// 잘못된 패킷이나 외부 트래픽은 로그 후 무시하고 계속 수신한다.
pub fn listen_for_offer(config: &Config) -> Result<ServerOffer> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.broadcast_port))?;
    socket.set_broadcast(true)?;

    info!(
        "listening for server offers on port {} (timeout {:?})",
        config.broadcast_port, config.discovery_timeout
    );

    let deadline = Instant::now() + config.discovery_timeout;
    let mut buf = [0u8; 64];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::NoServerFound {
                waited: config.discovery_timeout,
            });
        }
        socket.set_read_timeout(Some(remaining))?;

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(Error::NoServerFound {
                    waited: config.discovery_timeout,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match Offer::from_bytes(&buf[..len]) {
            Ok(offer) => {
                info!(
                    "offer received from {}: udp={} tcp={}",
                    from.ip(),
                    offer.udp_port,
                    offer.tcp_port
                );
                return Ok(ServerOffer {
                    addr: from.ip(),
                    udp_port: offer.udp_port,
                    tcp_port: offer.tcp_port,
                });
            }
            Err(e) => debug!("ignoring datagram from {}: {}", from, e),
        }
    }
}
