//! ironhook 공통 타입
//!
//! 플러그인과 호스트가 공유하는 값 타입을 정의합니다.
//!
//! - [`Handle`] / [`HandleTable`]: 호스트 소유 객체의 불투명 식별자
//! - [`OptionLookup`] / [`OptionTable`]: 핸들 단위 옵션 조회
//! - [`Message`]: 참조 카운트 로그 레코드
//! - [`PositionToken`]: cursor/bookmark
//! - [`DiagnosticSink`]: 격리된 실패의 보고 채널
//! - [`HostConfig`]: `ironhook.toml` 설정

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod options;
pub mod position;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, CoreError, HandleError, MessageError, PositionError};

// 설정
pub use config::{GeneralConfig, HostConfig, PluginEntry};

// 진단
pub use diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticSink, MemorySink, TracingSink};

// 도메인 타입
pub use handle::{Handle, HandleTable};
pub use message::{LogRecord, MESSAGE_FIELD, Message, MessageSnapshot};
pub use options::{OptionLookup, OptionSource, OptionTable};
pub use position::PositionToken;
