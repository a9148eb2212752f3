//! 루프백 엔드투엔드 테스트
//!
//! 실제 소켓으로 127.0.0.1 위에서 탐색, UDP/TCP 전송,
//! 오케스트레이터 동작을 검증한다.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use nsp::message::{Offer, PayloadHeader};
use nsp::{discover, run_transfers, tcp, udp, Config, Error, Protocol, Server, ServerOffer};

fn test_config() -> Config {
    Config {
        udp_recv_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

fn spawn_tcp_server(config: Config) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let config = config.clone();
            thread::spawn(move || tcp::handle_client(stream, &config));
        }
    });
    addr
}

#[test]
fn zero_discovery_timeout_returns_no_server_found_without_blocking() {
    let config = Config {
        broadcast_port: 42311,
        discovery_timeout: Duration::ZERO,
        ..Config::default()
    };

    let start = Instant::now();
    let result = discover::listen_for_offer(&config);

    assert!(matches!(result, Err(Error::NoServerFound { .. })));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn listener_skips_foreign_traffic_and_accepts_first_valid_offer() {
    let config = Config {
        broadcast_port: 42312,
        discovery_timeout: Duration::from_secs(5),
        ..Config::default()
    };
    let port = config.broadcast_port;

    let sender = thread::spawn(move || {
        // 리스너가 바인딩할 시간을 준다
        thread::sleep(Duration::from_millis(150));
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let target = (Ipv4Addr::LOCALHOST, port);

        socket.send_to(b"not an offer", target).unwrap();

        let mut bad_magic = Offer::new(1, 2).to_bytes();
        bad_magic[0] ^= 0xFF;
        socket.send_to(&bad_magic, target).unwrap();

        socket
            .send_to(&Offer::new(1111, 2222).to_bytes(), target)
            .unwrap();
    });

    let offer = discover::listen_for_offer(&config).unwrap();
    sender.join().unwrap();

    assert_eq!(offer.udp_port, 1111);
    assert_eq!(offer.tcp_port, 2222);
    assert_eq!(offer.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[test]
fn tcp_transfer_of_zero_bytes_completes_immediately() {
    let config = test_config();
    let addr = spawn_tcp_server(config.clone());

    let record = tcp::download(addr, 0, 1, &config).unwrap();

    assert_eq!(record.bytes_received, 0);
    assert_eq!(record.bits_per_second, 0.0);
    assert!(record.elapsed < Duration::from_secs(5));
}

#[test]
fn tcp_transfer_receives_exact_byte_count() {
    let config = test_config();
    let addr = spawn_tcp_server(config.clone());

    let record = tcp::download(addr, 100_000, 7, &config).unwrap();

    assert_eq!(record.connection_id, 7);
    assert_eq!(record.protocol, Protocol::Tcp);
    assert_eq!(record.bytes_received, 100_000);
    assert!(record.bits_per_second > 0.0);
}

#[test]
fn tcp_server_closes_on_non_numeric_request() {
    let config = test_config();
    let addr = spawn_tcp_server(config);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(b"not a number\n").unwrap();

    // 응답 없이 닫혀야 한다
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn udp_loopback_transfer_has_full_delivery() {
    let config = test_config();

    let server_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let server_addr = server_socket.local_addr().unwrap();

    let server_config = config.clone();
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let (len, peer) = server_socket.recv_from(&mut buf).unwrap();
        udp::handle_request(&buf[..len], peer, &server_config);
    });

    let record = udp::download(server_addr, 10_000, 1, &config).unwrap();

    assert_eq!(record.protocol, Protocol::Udp);
    assert_eq!(record.packets_expected, Some(10));
    assert_eq!(record.packets_received, Some(10));
    assert_eq!(record.delivery_ratio, Some(1.0));
    assert_eq!(record.bytes_received, 10_000);
}

#[test]
fn udp_client_ignores_header_with_inflated_segment_count() {
    let config = test_config();

    let server_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let server_addr = server_socket.local_addr().unwrap();

    let server_config = config.clone();
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let (len, peer) = server_socket.recv_from(&mut buf).unwrap();

        // 기대치를 아득히 넘는 세그먼트 수를 실은 헤더를 먼저 흘린다.
        // 클라이언트가 이 값으로 비트맵을 잡으면 할당 실패로 죽는다.
        let bogus = PayloadHeader::new(u64::MAX, 0).to_bytes();
        server_socket.send_to(&bogus, peer).unwrap();

        udp::handle_request(&buf[..len], peer, &server_config);
    });

    let record = udp::download(server_addr, 10_000, 1, &config).unwrap();

    assert_eq!(record.packets_expected, Some(10));
    assert_eq!(record.packets_received, Some(10));
    assert_eq!(record.delivery_ratio, Some(1.0));
    assert_eq!(record.bytes_received, 10_000);
}

#[test]
fn udp_download_of_zero_bytes_completes_without_waiting() {
    let config = test_config();

    // 응답하지 않는 피어: 세그먼트 0개라 수신 대기 자체가 없어야 한다
    let silent_peer = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = silent_peer.local_addr().unwrap();

    let start = Instant::now();
    let record = udp::download(addr, 0, 1, &config).unwrap();

    assert!(start.elapsed() < config.udp_recv_timeout);
    assert_eq!(record.packets_expected, Some(0));
    assert_eq!(record.packets_received, Some(0));
    assert_eq!(record.bytes_received, 0);
}

#[test]
fn orchestrator_produces_one_record_per_connection() {
    let config = Config {
        broadcast_port: 42313,
        udp_port: 0,
        tcp_port: 0,
        udp_recv_timeout: Duration::from_millis(500),
        ..Config::default()
    };

    let server = Server::bind(config.clone()).unwrap();
    let offer = ServerOffer {
        addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        udp_port: server.udp_port(),
        tcp_port: server.tcp_port(),
    };
    thread::spawn(move || server.run());

    let report = run_transfers(&offer, 50_000, 3, 2, &config);

    assert_eq!(report.records.len(), 5);
    assert_eq!(report.count(Protocol::Tcp), 3);
    assert_eq!(report.count(Protocol::Udp), 2);

    let mut tcp_ids: Vec<u32> = report
        .records
        .iter()
        .filter(|r| r.protocol == Protocol::Tcp)
        .map(|r| r.connection_id)
        .collect();
    tcp_ids.sort_unstable();
    assert_eq!(tcp_ids, vec![1, 2, 3]);

    let mut udp_ids: Vec<u32> = report
        .records
        .iter()
        .filter(|r| r.protocol == Protocol::Udp)
        .map(|r| r.connection_id)
        .collect();
    udp_ids.sort_unstable();
    assert_eq!(udp_ids, vec![1, 2]);

    for record in &report.records {
        if record.protocol == Protocol::Tcp {
            assert_eq!(record.bytes_received, 50_000);
        }
    }
}
