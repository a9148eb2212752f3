//! NSP 서버 - Network Speedtest Protocol
//!
//! 브로드캐스트 탐색 기반 TCP/UDP 처리량 벤치마크 서버
//! - 매초 Offer 브로드캐스트로 데이터 포트 공지
//! - UDP Request당 독립 스레드로 세그먼트 송신
//! - TCP 연결당 독립 스레드로 필러 스트리밍
//!
//! 사용법:
//!   cargo run --release --bin nsp-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 포트로 실행
//!   cargo run --release --bin nsp-server
//!
//!   # 포트 지정
//!   cargo run --release --bin nsp-server -- --udp-port 15000 --tcp-port 16000

use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nsp::{Config, Server};

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::from_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--broadcast-port" | "-b" => {
                if i + 1 < args.len() {
                    config.broadcast_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--udp-port" | "-u" => {
                if i + 1 < args.len() {
                    config.udp_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--tcp-port" | "-t" => {
                if i + 1 < args.len() {
                    config.tcp_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--interval" => {
                if i + 1 < args.len() {
                    let secs: f64 = args[i + 1].parse().expect("유효한 숫자 필요");
                    config.broadcast_interval = Duration::from_secs_f64(secs);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"NSP Server - Network Speedtest Protocol 서버

브로드캐스트 탐색 기반 TCP/UDP 처리량 벤치마크 서버
- 매초 Offer 브로드캐스트로 데이터 포트 공지
- 요청/연결당 독립 스레드 처리

사용법:
  cargo run --release --bin nsp-server -- [OPTIONS]

옵션:
  -b, --broadcast-port <PORT>  Offer 브로드캐스트 포트 (기본: 12345)
  -u, --udp-port <PORT>        UDP 데이터 포트 (기본: 15000)
  -t, --tcp-port <PORT>        TCP 데이터 포트 (기본: 16000)
  --interval <SECS>            Offer 송출 간격 초 (기본: 1)
  -h, --help                   이 도움말 출력

환경 변수:
  NSP_BROADCAST_PORT, NSP_UDP_PORT, NSP_TCP_PORT
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = parse_args();

    info!("NSP Server starting...");
    info!("Broadcast port: {}", config.broadcast_port);
    info!("UDP data port: {}", config.udp_port);
    info!("TCP data port: {}", config.tcp_port);
    info!("Segment size: {} bytes", config.segment_size);

    let server = Server::bind(config)?;
    server.run()?;
    Ok(())
}
