//! 소스 프록시 -- 읽기, ack/nack, cursor 복원

use std::fmt;
use std::sync::{Arc, OnceLock};

use ironhook_core::diagnostics::DiagnosticSeverity;
use ironhook_core::message::Message;
use ironhook_core::metrics as m;
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;

use super::{ResumeOutcome, deinit_plugin, init_plugin};
use crate::capability::{Acknowledge, IgnoreAcks, ReadResult, Source, TrackedSource};
use crate::containment::Containment;

/// 플러그인이 통계 인스턴스 이름을 주지 않을 때의 기본값
pub const DEFAULT_STATS_INSTANCE: &str = "LogThreadedSource";

/// 소스 격리 프록시
///
/// `S`는 구체 타입이거나 `dyn Source` / `dyn TrackedSource`입니다.
/// `TrackedSource`일 때만 cursor 연산이 제공됩니다.
pub struct SourceProxy<S: ?Sized + Source> {
    plugin: Box<S>,
    guard: Containment,
    group: String,
    stats_instance: OnceLock<String>,
    persist_name: OnceLock<String>,
}

impl<S: ?Sized + Source> SourceProxy<S> {
    pub fn new(plugin: Box<S>, guard: Containment, group: impl Into<String>) -> Self {
        Self {
            plugin,
            guard,
            group: group.into(),
            stats_instance: OnceLock::new(),
            persist_name: OnceLock::new(),
        }
    }

    pub fn containment(&self) -> &Containment {
        &self.guard
    }

    pub fn init(&mut self, options: &OptionLookup) -> bool {
        init_plugin(&self.guard, &mut *self.plugin, options)
    }

    pub fn deinit(&mut self) {
        deinit_plugin(&self.guard, &mut *self.plugin);
    }

    pub fn open(&mut self) -> bool {
        self.guard.guard_void("open", || self.plugin.open())
    }

    pub fn close(&mut self) {
        self.guard.guard_void("close", || self.plugin.close());
    }

    /// 메시지 하나를 읽습니다. 실패하면 `NothingToRead`입니다.
    pub fn read_message(&mut self, msg: &Message) -> ReadResult {
        let result = self.guard.guard("read_message", ReadResult::NothingToRead, || {
            self.plugin.read_message(msg)
        });
        metrics::counter!(
            m::SOURCE_READS_TOTAL,
            m::LABEL_KIND => self.guard.kind().as_str(),
            m::LABEL_RESULT => result.as_str()
        )
        .increment(1);
        result
    }

    pub fn is_readable(&self) -> bool {
        self.guard
            .guard("is_readable", false, || Ok(self.plugin.is_readable()))
    }

    /// 통계 인스턴스 이름. 첫 호출 결과가 캐시됩니다.
    pub fn stats_instance(&self) -> &str {
        self.stats_instance.get_or_init(|| {
            self.guard
                .guard("get_stats_instance", None, || Ok(self.plugin.stats_instance()))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_STATS_INSTANCE.to_owned())
        })
    }

    /// 영속 저장소 키. 첫 호출 결과가 캐시됩니다.
    ///
    /// 기본값은 `{group}:{instance}:LogThreadedSource`입니다.
    pub fn persist_name(&self) -> &str {
        self.persist_name.get_or_init(|| {
            self.guard
                .guard("get_persist_name", None, || Ok(self.plugin.persist_name()))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| {
                    format!(
                        "{}:{}:{}",
                        self.group,
                        self.guard.instance(),
                        DEFAULT_STATS_INSTANCE
                    )
                })
        })
    }

    /// 다른 스레드로 보낼 수 있는 ack/nack 핸들
    pub fn ack_handle(&self) -> AckHandle {
        let acker = self
            .guard
            .guard("acknowledger", None, || Ok(Some(self.plugin.acknowledger())))
            .unwrap_or_else(|| Arc::new(IgnoreAcks));
        AckHandle {
            acker,
            guard: self.guard.clone(),
        }
    }
}

impl<S: ?Sized + TrackedSource> SourceProxy<S> {
    pub fn cursor(&self) -> Option<PositionToken> {
        self.guard
            .guard("get_cursor", None, || self.plugin.cursor().map(Some))
    }

    pub fn seek_to_cursor(&mut self, cursor: &PositionToken) -> bool {
        self.guard
            .guard_void("seek_to_cursor", || self.plugin.seek_to_cursor(cursor))
    }

    /// 호스트가 저장한 cursor로 재개합니다. `open` 전에 호출합니다.
    ///
    /// 이동에 실패하면 경고를 남기고 플러그인의 기본 위치에서 읽습니다.
    pub fn resume(&mut self, saved: Option<&PositionToken>) -> ResumeOutcome {
        let Some(cursor) = saved else {
            return ResumeOutcome::Default;
        };
        if self.seek_to_cursor(cursor) {
            return ResumeOutcome::Restored;
        }
        self.guard.report(
            DiagnosticSeverity::Warning,
            "resume",
            format!("failed to seek to saved cursor '{cursor}', reading from default position"),
        );
        metrics::counter!(m::POSITION_FALLBACKS_TOTAL, m::LABEL_KIND => self.guard.kind().as_str())
            .increment(1);
        ResumeOutcome::FellBack
    }
}

impl<S: ?Sized + Source> fmt::Debug for SourceProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceProxy")
            .field("instance", &self.guard.instance())
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

// ─── AckHandle ───────────────────────────────────────────────────────

/// ack/nack 전달 핸들
///
/// `Send + Sync`이며 복제할 수 있습니다. 소스 프록시와 독립적으로
/// 다른 스레드에서 사용할 수 있습니다.
#[derive(Clone)]
pub struct AckHandle {
    acker: Arc<dyn Acknowledge>,
    guard: Containment,
}

impl AckHandle {
    /// 메시지가 최종 처리되었음을 알립니다.
    pub fn ack(&self, msg: &Message) -> bool {
        metrics::counter!(m::SOURCE_ACKS_TOTAL, m::LABEL_RESULT => "ack").increment(1);
        self.guard.guard_void("ack", || self.acker.ack(msg))
    }

    /// 메시지 처리가 실패했음을 알립니다.
    pub fn nack(&self, msg: &Message) -> bool {
        metrics::counter!(m::SOURCE_ACKS_TOTAL, m::LABEL_RESULT => "nack").increment(1);
        self.guard.guard_void("nack", || self.acker.nack(msg))
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}
