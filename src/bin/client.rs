//! NSP 클라이언트 - Network Speedtest Protocol
//!
//! 브로드캐스트로 서버를 찾아 TCP/UDP 병렬 다운로드를 수행하고
//! 연결별 통계와 집계 보고서를 출력한다.
//!
//! 사용법:
//!   cargo run --release --bin nsp-client -- [OPTIONS]
//!
//! 예시:
//!   # 4MiB를 TCP 1개 + UDP 1개로 수신
//!   cargo run --release --bin nsp-client
//!
//!   # 100MB를 TCP 3개 + UDP 2개로 수신
//!   cargo run --release --bin nsp-client -- --size 104857600 --tcp 3 --udp 2

use std::time::Duration;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use nsp::{discover, run_transfers, Config, Error};

/// 클라이언트 옵션
struct ClientOptions {
    file_size: u64,
    tcp_connections: u32,
    udp_connections: u32,
    config: Config,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            file_size: 4 * 1024 * 1024,
            tcp_connections: 1,
            udp_connections: 1,
            config: Config::from_env(),
        }
    }
}

fn parse_args() -> ClientOptions {
    let args: Vec<String> = std::env::args().collect();
    let mut options = ClientOptions::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" | "-s" => {
                if i + 1 < args.len() {
                    options.file_size = args[i + 1].parse().expect("유효한 크기 필요");
                    i += 1;
                }
            }
            "--tcp" | "-t" => {
                if i + 1 < args.len() {
                    options.tcp_connections = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--udp" | "-u" => {
                if i + 1 < args.len() {
                    options.udp_connections = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    let secs: u64 = args[i + 1].parse().expect("유효한 숫자 필요");
                    options.config.discovery_timeout = Duration::from_secs(secs);
                    i += 1;
                }
            }
            "--broadcast-port" | "-b" => {
                if i + 1 < args.len() {
                    options.config.broadcast_port = args[i + 1].parse().expect("유효한 포트 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"NSP Client - Network Speedtest Protocol 클라이언트

브로드캐스트로 서버를 찾아 TCP/UDP 병렬 다운로드 벤치마크 수행

사용법:
  cargo run --release --bin nsp-client -- [OPTIONS]

옵션:
  -s, --size <BYTES>           요청 파일 크기 (기본: 4194304 = 4MiB)
  -t, --tcp <N>                TCP 동시 연결 수 (기본: 1)
  -u, --udp <N>                UDP 동시 연결 수 (기본: 1)
  --timeout <SECS>             Offer 대기 타임아웃 초 (기본: 20)
  -b, --broadcast-port <PORT>  Offer 브로드캐스트 포트 (기본: 12345)
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

    // 코어 호출 전 양수 검증 (오케스트레이터는 검증된 값만 받는다)
    if options.file_size == 0 {
        eprintln!("파일 크기는 양수여야 합니다");
        std::process::exit(1);
    }
    if options.tcp_connections == 0 || options.udp_connections == 0 {
        eprintln!("TCP/UDP 연결 수는 양수여야 합니다");
        std::process::exit(1);
    }

    options
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = parse_args();

    info!("NSP Client starting...");
    info!("File size: {} bytes", options.file_size);
    info!(
        "Connections: {} TCP + {} UDP",
        options.tcp_connections, options.udp_connections
    );

    let offer = match discover::listen_for_offer(&options.config) {
        Ok(offer) => offer,
        Err(Error::NoServerFound { waited }) => {
            // 타임아웃은 정상적인 결과: 빈 손으로 종료
            warn!("no server offer received within {:?}", waited);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!("Server found at {}", offer.addr);

    let report = run_transfers(
        &offer,
        options.file_size,
        options.tcp_connections,
        options.udp_connections,
        &options.config,
    );

    for record in &report.records {
        info!("{}", record.summary());
    }
    info!("{}", report.summary());
    Ok(())
}
