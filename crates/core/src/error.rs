//! 에러 타입 -- 도메인별 에러 정의

/// ironhook 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 메시지 참조 에러
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// 위치 토큰 에러
    #[error("position error: {0}")]
    Position(#[from] PositionError),

    /// 핸들 에러
    #[error("handle error: {0}")]
    Handle(#[from] HandleError),

    /// 플러그인 계약 에러 (contract 크레이트에서 변환)
    #[error("plugin error: {0}")]
    Plugin(String),

    /// 로깅 초기화 에러
    #[error("logging error: {0}")]
    Logging(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 필수 옵션 누락
    #[error("required option '{key}' is not set")]
    MissingOption { key: String },
}

/// 메시지 참조 에러
///
/// 해제된 참조의 재사용과 이중 해제를 구분합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// 이미 해제된 참조로 접근
    #[error("message reference used after release")]
    Released,

    /// 같은 참조를 두 번 해제
    #[error("message reference released twice")]
    AlreadyReleased,
}

/// 위치 토큰 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// 빈 토큰
    #[error("position token is empty")]
    Empty,

    /// 최대 길이 초과
    #[error("position token too long: {len} bytes (max: {max})")]
    TooLong { len: usize, max: usize },
}

/// 핸들 에러
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// NULL 핸들
    #[error("null handle")]
    Null,

    /// 해제되었거나 다른 테이블의 핸들
    #[error("stale handle: {handle:#x}")]
    Stale { handle: u64 },
}
