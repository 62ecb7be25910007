//! 격리 경계 -- 플러그인 실패를 센티널 값과 진단으로 변환
//!
//! 모든 프록시 연산은 [`Containment::guard`]를 통해 플러그인을 호출합니다.
//! 플러그인이 `Err`를 반환하거나 패닉하면:
//!
//! 1. 진단 싱크에 보고하고
//! 2. `ironhook_contained_failures_total` 카운터를 증가시키고
//! 3. 연산별 센티널 값(`false`, `None`, `NothingToRead` 등)을 반환합니다.
//!
//! 실패는 호스트 호출 스택으로 전파되지 않습니다.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use ironhook_core::diagnostics::{Diagnostic, DiagnosticSeverity, DiagnosticSink};
use ironhook_core::metrics as m;

use crate::capability::CapabilityKind;
use crate::error::PluginError;

/// 패닉 페이로드에서 사람이 읽을 수 있는 메시지를 꺼냅니다.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_owned();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_owned()
}

/// 인스턴스 하나의 격리 경계
#[derive(Clone)]
pub struct Containment {
    instance: Arc<str>,
    kind: CapabilityKind,
    sink: Arc<dyn DiagnosticSink>,
}

impl Containment {
    pub fn new(
        instance: impl Into<Arc<str>>,
        kind: CapabilityKind,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            instance: instance.into(),
            kind,
            sink,
        }
    }

    /// 인스턴스 id
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// 플러그인 호출을 격리합니다.
    ///
    /// 실패하거나 패닉하면 보고 후 `fallback`을 반환합니다.
    pub fn guard<T>(
        &self,
        operation: &'static str,
        fallback: T,
        f: impl FnOnce() -> Result<T, PluginError>,
    ) -> T {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                self.contained(operation, "error");
                self.report(err.severity(), operation, err.to_string());
                fallback
            }
            Err(payload) => {
                self.contained(operation, "panic");
                self.report(
                    DiagnosticSeverity::Error,
                    operation,
                    format!("plugin panicked: {}", panic_message(payload.as_ref())),
                );
                fallback
            }
        }
    }

    /// 반환값이 없는 연산을 격리합니다. 성공 여부를 반환합니다.
    pub fn guard_void(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> Result<(), PluginError>,
    ) -> bool {
        self.guard(operation, false, || f().map(|()| true))
    }

    /// 진단을 보고합니다.
    pub fn report(&self, severity: DiagnosticSeverity, operation: &str, message: impl Into<String>) {
        self.sink.report(&Diagnostic::new(
            severity,
            self.instance.as_ref(),
            operation,
            message,
        ));
    }

    fn contained(&self, operation: &'static str, cause: &'static str) {
        metrics::counter!(
            m::CONTAINED_FAILURES_TOTAL,
            m::LABEL_KIND => self.kind.as_str(),
            m::LABEL_OPERATION => operation,
            m::LABEL_CAUSE => cause
        )
        .increment(1);
    }
}

impl fmt::Debug for Containment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Containment")
            .field("instance", &self.instance)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
