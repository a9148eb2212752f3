//! 에러 타입 정의

use std::time::Duration;

use thiserror::Error;

/// NSP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("유효하지 않은 매직 쿠키: expected {expected:08X}, got {got:08X}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("잘못된 메시지 길이: expected {expected}, got {got}")]
    MalformedMessage { expected: usize, got: usize },

    #[error("알 수 없는 메시지 타입: {got:#04x}")]
    UnknownMessageType { got: u8 },

    #[error("서버를 찾을 수 없음: {waited:?} 동안 유효한 Offer 없음")]
    NoServerFound { waited: Duration },

    #[error("유효하지 않은 요청 라인: {0:?}")]
    InvalidRequestLine(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
