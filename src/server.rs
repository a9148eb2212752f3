//! 서버 조립
//!
//! 브로드캐스터, UDP 요청 루프, TCP 수락 루프 3개의 상시 루프를 돌린다.
//! 소켓 바인딩 실패만 시작 단계의 치명적 에러이고, 정상 상태의
//! 요청/연결 단위 에러는 전부 로그 후 격리된다.

use std::net::{Ipv4Addr, TcpListener, UdpSocket};
use std::thread;

use tracing::{info, warn};

use crate::{discover, tcp, udp, Config, Result};

/// NSP 서버
///
/// `bind`가 데이터 소켓을 미리 바인딩하므로 (포트 0 지원)
/// 실제 포트를 Offer 공지와 테스트에 그대로 쓸 수 있다.
pub struct Server {
    config: Config,
    udp_socket: UdpSocket,
    tcp_listener: TcpListener,
}

impl Server {
    /// 데이터 소켓 바인딩
    ///
    /// 실패는 복구 불가능한 시작 에러로 호출자에게 그대로 올린다.
    pub fn bind(config: Config) -> Result<Self> {
        let udp_socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.udp_port))?;
        let tcp_listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.tcp_port))?;

        Ok(Self {
            config,
            udp_socket,
            tcp_listener,
        })
    }

    /// 실제 바인딩된 UDP 데이터 포트
    pub fn udp_port(&self) -> u16 {
        self.udp_socket
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(self.config.udp_port)
    }

    /// 실제 바인딩된 TCP 데이터 포트
    pub fn tcp_port(&self) -> u16 {
        self.tcp_listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(self.config.tcp_port)
    }

    /// 서버 실행
    ///
    /// 브로드캐스터와 UDP 루프를 스레드로 띄우고 TCP 수락 루프를
    /// 현재 스레드에서 돈다. 반환하지 않는다.
    pub fn run(self) -> Result<()> {
        let udp_port = self.udp_port();
        let tcp_port = self.tcp_port();

        info!(
            "server ready: udp={} tcp={} broadcast={}",
            udp_port, tcp_port, self.config.broadcast_port
        );

        let broadcast_config = self.config.clone();
        thread::spawn(move || {
            if let Err(e) = discover::run_broadcaster(&broadcast_config, udp_port, tcp_port) {
                warn!("offer broadcaster stopped: {}", e);
            }
        });

        let udp_config = self.config.clone();
        let udp_socket = self.udp_socket;
        thread::spawn(move || run_udp_loop(udp_socket, udp_config));

        run_tcp_loop(self.tcp_listener, self.config)
    }
}

/// UDP 요청 수신 루프: 데이터그램당 스레드 1개
fn run_udp_loop(socket: UdpSocket, config: Config) {
    info!(
        "UDP server listening on port {}",
        socket.local_addr().map(|a| a.port()).unwrap_or(0)
    );

    let mut buf = [0u8; 1024];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((len, peer)) => {
                let datagram = buf[..len].to_vec();
                let config = config.clone();
                thread::spawn(move || udp::handle_request(&datagram, peer, &config));
            }
            Err(e) => warn!("UDP receive failed: {}", e),
        }
    }
}

/// TCP 수락 루프: 연결당 스레드 1개
fn run_tcp_loop(listener: TcpListener, config: Config) -> Result<()> {
    info!(
        "TCP server listening on port {}",
        listener.local_addr().map(|a| a.port()).unwrap_or(0)
    );

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("new TCP connection from {}", peer);
                let config = config.clone();
                thread::spawn(move || tcp::handle_client(stream, &config));
            }
            Err(e) => warn!("TCP accept failed: {}", e),
        }
    }
}
