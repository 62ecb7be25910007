//! 리더 프록시 -- 폴링, 일괄 fetch, bookmark 복원

use std::fmt;

use ironhook_core::config::DEFAULT_FETCH_LIMIT;
use ironhook_core::diagnostics::DiagnosticSeverity;
use ironhook_core::message::Message;
use ironhook_core::metrics as m;
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;

use super::{ResumeOutcome, deinit_plugin, init_plugin};
use crate::capability::Reader;
use crate::containment::Containment;

/// 한 번의 폴링으로 가져온 메시지와 마지막 bookmark
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// 전달이 확정된 메시지
    pub messages: Vec<Message>,
    /// 마지막 fetch 직후의 bookmark
    pub bookmark: Option<PositionToken>,
}

impl FetchBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// 리더 격리 프록시
pub struct ReaderProxy<R: ?Sized + Reader> {
    plugin: Box<R>,
    guard: Containment,
}

impl<R: ?Sized + Reader> ReaderProxy<R> {
    pub fn new(plugin: Box<R>, guard: Containment) -> Self {
        Self { plugin, guard }
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

    pub fn is_opened(&self) -> bool {
        self.guard
            .guard("is_opened", false, || Ok(self.plugin.is_opened()))
    }

    /// 열려 있지 않으면 엽니다.
    pub(crate) fn ensure_open(&mut self) -> bool {
        self.is_opened() || self.open()
    }

    /// 폴링 조건: 열려 있고 읽을 수 있음
    pub(crate) fn check_source(&mut self) -> bool {
        self.ensure_open() && self.is_readable()
    }

    pub fn fetch(&mut self, msg: &Message) -> bool {
        self.guard.guard("fetch", false, || self.plugin.fetch(msg))
    }

    pub fn is_readable(&self) -> bool {
        self.guard
            .guard("is_readable", false, || Ok(self.plugin.is_readable()))
    }

    pub fn bookmark(&self) -> Option<PositionToken> {
        self.guard
            .guard("get_bookmark", None, || self.plugin.bookmark().map(Some))
    }

    pub fn seek_to_bookmark(&mut self, bookmark: &PositionToken) -> bool {
        self.guard
            .guard_void("seek_to_bookmark", || self.plugin.seek_to_bookmark(bookmark))
    }

    /// 리더의 영속 이름. 실패하면 인스턴스 id입니다.
    pub fn name_by_uniq_options(&self) -> String {
        self.guard
            .guard("get_name_by_uniq_options", None, || {
                Ok(Some(self.plugin.name_by_uniq_options()))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.guard.instance().to_owned())
    }

    /// 최대 `limit`개를 가져옵니다. 첫 실패에서 멈춥니다.
    ///
    /// `limit`이 0이면 기본값(10)을 사용합니다.
    pub fn fetch_batch(&mut self, limit: usize) -> FetchBatch {
        let limit = if limit == 0 { DEFAULT_FETCH_LIMIT } else { limit };
        let mut batch = FetchBatch::default();
        for _ in 0..limit {
            let msg = Message::new();
            if !self.fetch(&msg) {
                break;
            }
            batch.bookmark = self.bookmark();
            batch.messages.push(msg);
        }
        batch
    }

    /// 호스트가 저장한 bookmark로 재개합니다.
    pub fn resume(&mut self, saved: Option<&PositionToken>) -> ResumeOutcome {
        let Some(bookmark) = saved else {
            return ResumeOutcome::Default;
        };
        if self.seek_to_bookmark(bookmark) {
            return ResumeOutcome::Restored;
        }
        self.guard.report(
            DiagnosticSeverity::Warning,
            "resume",
            format!("failed to seek to saved bookmark '{bookmark}', reading from current position"),
        );
        metrics::counter!(m::POSITION_FALLBACKS_TOTAL, m::LABEL_KIND => self.guard.kind().as_str())
            .increment(1);
        ResumeOutcome::FellBack
    }
}

impl<R: ?Sized + Reader> fmt::Debug for ReaderProxy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderProxy")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}
