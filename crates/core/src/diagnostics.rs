//! 진단 싱크 -- 격리된 실패를 보고하는 부수 채널
//!
//! 플러그인 안에서 발생해 격리된 실패는 반환값이 아니라 [`DiagnosticSink`]로
//! 보고됩니다. 기본 구현인 [`TracingSink`]는 `tracing` 이벤트로 전달하고,
//! [`MemorySink`]는 호스트가 나중에 확인할 수 있도록 기록을 보관합니다.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// 진단 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// 진단 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 심각도
    pub severity: DiagnosticSeverity,
    /// 보고한 인스턴스 id
    pub instance: String,
    /// 실패한 연산 이름
    pub operation: String,
    /// 사람이 읽을 수 있는 설명
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        instance: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            instance: instance.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}::{}: {}",
            self.severity, self.instance, self.operation, self.message
        )
    }
}

/// 진단 보고 대상
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// `tracing` 이벤트로 전달하는 싱크
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, d: &Diagnostic) {
        match d.severity {
            DiagnosticSeverity::Debug => tracing::debug!(
                instance = %d.instance,
                operation = %d.operation,
                "{}",
                d.message
            ),
            DiagnosticSeverity::Info => tracing::info!(
                instance = %d.instance,
                operation = %d.operation,
                "{}",
                d.message
            ),
            DiagnosticSeverity::Warning => tracing::warn!(
                instance = %d.instance,
                operation = %d.operation,
                "{}",
                d.message
            ),
            DiagnosticSeverity::Error => tracing::error!(
                instance = %d.instance,
                operation = %d.operation,
                "{}",
                d.message
            ),
        }
    }
}

/// 진단을 메모리에 보관하는 싱크
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 보고된 진단의 복사본
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 주어진 연산에 대한 진단 수
    pub fn count_for(&self, operation: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.operation == operation)
            .count()
    }

    /// 주어진 심각도 이상인 진단 수
    pub fn count_at_least(&self, severity: DiagnosticSeverity) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.severity >= severity)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.report(&Diagnostic::new(
            DiagnosticSeverity::Debug,
            "src",
            "open",
            "opened",
        ));
        sink.report(&Diagnostic::new(
            DiagnosticSeverity::Error,
            "src",
            "read_message",
            "boom",
        ));
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].operation, "read_message");
        assert_eq!(sink.count_for("open"), 1);
        assert_eq!(sink.count_at_least(DiagnosticSeverity::Warning), 1);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic::new(DiagnosticSeverity::Warning, "reader", "seek", "bad bookmark");
        assert_eq!(d.to_string(), "[warning] reader::seek: bad bookmark");
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.report(&Diagnostic::new(
            DiagnosticSeverity::Error,
            "x",
            "y",
            "z",
        ));
    }

    #[test]
    fn severity_orders_by_importance() {
        assert!(DiagnosticSeverity::Error > DiagnosticSeverity::Warning);
        assert!(DiagnosticSeverity::Debug < DiagnosticSeverity::Info);
    }
}
