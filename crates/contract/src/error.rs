//! 계약 계층 에러 타입
//!
//! [`PluginError`]는 플러그인 연산이 반환하는 실패입니다. 격리 계층은 이
//! 에러를 호스트로 전파하지 않고 연산별 센티널 값과 진단으로 바꿉니다.
//! `From<PluginError> for CoreError` 변환이 구현되어 있어 호스트 코드에서
//! `?` 연산자로 전파할 수도 있습니다.

use ironhook_core::diagnostics::DiagnosticSeverity;
use ironhook_core::error::{ConfigError, CoreError, MessageError};

/// 플러그인 연산 실패
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// 필수 옵션 누락 또는 잘못된 옵션 값 (init 단계)
    #[error("configuration error: option '{key}': {reason}")]
    Config {
        /// 옵션 키
        key: String,
        /// 실패 사유
        reason: String,
    },

    /// 일시적 I/O 실패 (open/send/fetch)
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// 잘못된 cursor/bookmark
    #[error("invalid position '{token}': {reason}")]
    InvalidPosition {
        /// 전달된 토큰
        token: String,
        /// 실패 사유
        reason: String,
    },

    /// 입력 파싱 실패
    #[error("parse error at offset {offset}: {reason}")]
    Parse {
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 메시지 참조 규칙 위반
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// 현재 생명주기 상태에서 허용되지 않는 연산
    #[error("operation '{operation}' not allowed in state {state}")]
    InvalidState {
        /// 연산 이름
        operation: String,
        /// 현재 상태
        state: String,
    },

    /// 플러그인 로직 결함
    #[error("plugin fault: {0}")]
    Fault(String),
}

impl PluginError {
    /// 필수 옵션 누락 에러를 생성합니다.
    pub fn missing_option(key: &str) -> Self {
        Self::Config {
            key: key.to_owned(),
            reason: "required option is not set".to_owned(),
        }
    }

    /// 잘못된 위치 토큰 에러를 생성합니다.
    pub fn invalid_position(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            token: token.to_owned(),
            reason: reason.into(),
        }
    }

    /// 진단 보고 시 사용할 심각도
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            Self::InvalidState { .. } => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Error,
        }
    }
}

impl From<ConfigError> for PluginError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingOption { key } => Self::missing_option(&key),
            ConfigError::InvalidValue { field, reason } => Self::Config { key: field, reason },
            other => Self::Config {
                key: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<PluginError> for CoreError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Io(e) => CoreError::Io(e),
            PluginError::Message(e) => CoreError::Message(e),
            PluginError::Config { key, reason } => CoreError::Config(ConfigError::InvalidValue {
                field: key,
                reason,
            }),
            other => CoreError::Plugin(other.to_string()),
        }
    }
}

/// 플러그인 레지스트리 에러
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// 같은 클래스 이름이 이미 등록됨
    #[error("plugin class already registered: {class}")]
    AlreadyRegistered { class: String },

    /// 등록되지 않은 클래스
    #[error("plugin class not found: {class}")]
    NotFound { class: String },

    /// semver가 아닌 버전 문자열
    #[error("invalid version '{version}' for plugin class {class}: {reason}")]
    InvalidVersion {
        class: String,
        version: String,
        reason: String,
    },

    /// 설정된 capability와 클래스의 capability 불일치
    #[error("plugin class {class} provides {actual}, but {expected} was requested")]
    KindMismatch {
        class: String,
        expected: String,
        actual: String,
    },

    /// 알 수 없는 capability 이름
    #[error("unknown capability kind: {0}")]
    UnknownKind(String),
}

impl From<RegistryError> for CoreError {
    fn from(err: RegistryError) -> Self {
        CoreError::Plugin(err.to_string())
    }
}
