//! Capability 인스턴스 -- 생명주기 상태 머신
//!
//! [`CapabilityInstance`]는 설정 항목 하나에 대응하는 플러그인 인스턴스입니다.
//! 프록시를 소유하고, 모든 capability에 같은 생명주기 규칙을 적용합니다.
//!
//! # 생명주기
//! ```text
//! Uninitialized ─init()→ Initialized ─open()→ Opened ─close()→ Closed
//!       │                     │                 ↑  │              │
//!       │                     │                 └──┘ (re-open)    │ open()
//!       │                     │                                   ↓
//!       └──────────── deinit() (어느 상태에서든) ──────────→ Deinitialized
//! ```
//!
//! - `init` 실패 시 `Uninitialized`에 머뭅니다.
//! - `Opened`에서 `open`을 다시 호출하면 먼저 `close`합니다.
//! - `close`는 `Opened`가 아니면 아무것도 하지 않습니다.
//! - `deinit`은 한 번만 플러그인에 전달되며, `Opened`라면 먼저 닫습니다.
//!   인스턴스가 drop될 때 아직 호출되지 않았다면 자동으로 호출됩니다.

use std::fmt;
use std::sync::Arc;

use ironhook_core::diagnostics::{DiagnosticSeverity, DiagnosticSink};
use ironhook_core::message::Message;
use ironhook_core::metrics as m;
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;
use serde::{Deserialize, Serialize};

use crate::capability::{
    CapabilityKind, Destination, Filter, Parser, PluginObject, ReadResult, Reader, Rewriter,
    Source, TrackedSource,
};
use crate::containment::Containment;
use crate::error::PluginError;
use crate::proxy::{
    AckHandle, DestinationProxy, FetchBatch, FilterProxy, ParserProxy, ReaderProxy,
    ResumeOutcome, RewriterProxy, SourceProxy,
};

// ─── LifecycleState ──────────────────────────────────────────────────

/// 인스턴스 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// 생성됨 (init 전 또는 init 실패)
    Uninitialized,
    /// 초기화 완료 (open 가능)
    Initialized,
    /// 열림
    Opened,
    /// 닫힘 (다시 open 가능)
    Closed,
    /// 정리 완료 (종료 상태)
    Deinitialized,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Deinitialized => "deinitialized",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Capability ──────────────────────────────────────────────────────

/// capability 종류가 태그된 프록시
pub enum Capability {
    Source(SourceProxy<dyn Source>),
    TrackedSource(SourceProxy<dyn TrackedSource>),
    Reader(ReaderProxy<dyn Reader>),
    Filter(FilterProxy<dyn Filter>),
    Parser(ParserProxy<dyn Parser>),
    Rewriter(RewriterProxy<dyn Rewriter>),
    Destination(DestinationProxy<dyn Destination>),
}

impl Capability {
    /// 플러그인 객체를 격리 프록시로 감쌉니다.
    pub fn wrap(object: PluginObject, guard: Containment, group: &str) -> Self {
        match object {
            PluginObject::Source(p) => Self::Source(SourceProxy::new(p, guard, group)),
            PluginObject::TrackedSource(p) => {
                Self::TrackedSource(SourceProxy::new(p, guard, group))
            }
            PluginObject::Reader(p) => Self::Reader(ReaderProxy::new(p, guard)),
            PluginObject::Filter(p) => Self::Filter(FilterProxy::new(p, guard)),
            PluginObject::Parser(p) => Self::Parser(ParserProxy::new(p, guard)),
            PluginObject::Rewriter(p) => Self::Rewriter(RewriterProxy::new(p, guard)),
            PluginObject::Destination(p) => Self::Destination(DestinationProxy::new(p, guard)),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Source(_) => CapabilityKind::Source,
            Self::TrackedSource(_) => CapabilityKind::TrackedSource,
            Self::Reader(_) => CapabilityKind::Reader,
            Self::Filter(_) => CapabilityKind::Filter,
            Self::Parser(_) => CapabilityKind::Parser,
            Self::Rewriter(_) => CapabilityKind::Rewriter,
            Self::Destination(_) => CapabilityKind::Destination,
        }
    }

    fn init(&mut self, options: &OptionLookup) -> bool {
        match self {
            Self::Source(p) => p.init(options),
            Self::TrackedSource(p) => p.init(options),
            Self::Reader(p) => p.init(options),
            Self::Filter(p) => p.init(options),
            Self::Parser(p) => p.init(options),
            Self::Rewriter(p) => p.init(options),
            Self::Destination(p) => p.init(options),
        }
    }

    fn deinit(&mut self) {
        match self {
            Self::Source(p) => p.deinit(),
            Self::TrackedSource(p) => p.deinit(),
            Self::Reader(p) => p.deinit(),
            Self::Filter(p) => p.deinit(),
            Self::Parser(p) => p.deinit(),
            Self::Rewriter(p) => p.deinit(),
            Self::Destination(p) => p.deinit(),
        }
    }

    /// 자원이 없는 capability는 항상 성공합니다.
    fn open(&mut self) -> bool {
        match self {
            Self::Source(p) => p.open(),
            Self::TrackedSource(p) => p.open(),
            Self::Reader(p) => p.open(),
            Self::Destination(p) => p.open(),
            Self::Filter(_) | Self::Parser(_) | Self::Rewriter(_) => true,
        }
    }

    fn close(&mut self) {
        match self {
            Self::Source(p) => p.close(),
            Self::TrackedSource(p) => p.close(),
            Self::Reader(p) => p.close(),
            Self::Destination(p) => p.close(),
            Self::Filter(_) | Self::Parser(_) | Self::Rewriter(_) => {}
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.kind())
    }
}

// ─── CapabilityInstance ──────────────────────────────────────────────

/// 생명주기 규칙이 적용된 플러그인 인스턴스
pub struct CapabilityInstance {
    id: String,
    state: LifecycleState,
    capability: Capability,
    guard: Containment,
    deinit_called: bool,
}

impl CapabilityInstance {
    /// 플러그인 객체로 인스턴스를 생성합니다.
    ///
    /// `group`은 소스의 기본 persist name에 사용됩니다.
    pub fn new(
        id: impl Into<String>,
        group: &str,
        object: PluginObject,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let id = id.into();
        let guard = Containment::new(id.as_str(), object.kind(), sink);
        let capability = Capability::wrap(object, guard.clone(), group);
        Self {
            id,
            state: LifecycleState::Uninitialized,
            capability,
            guard,
            deinit_called: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CapabilityKind {
        self.capability.kind()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// 프록시에 직접 접근합니다. 생명주기 검사는 적용되지 않습니다.
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn capability_mut(&mut self) -> &mut Capability {
        &mut self.capability
    }

    // --- 생명주기 ---

    pub fn init(&mut self, options: &OptionLookup) -> bool {
        if self.state != LifecycleState::Uninitialized {
            self.reject("init");
            return false;
        }
        if !self.capability.init(options) {
            return false;
        }
        self.transition(LifecycleState::Initialized);
        true
    }

    pub fn open(&mut self) -> bool {
        match self.state {
            LifecycleState::Initialized | LifecycleState::Closed => {}
            LifecycleState::Opened => self.close(),
            LifecycleState::Uninitialized | LifecycleState::Deinitialized => {
                self.reject("open");
                return false;
            }
        }
        if !self.capability.open() {
            return false;
        }
        self.transition(LifecycleState::Opened);
        true
    }

    pub fn close(&mut self) {
        if self.state != LifecycleState::Opened {
            return;
        }
        self.capability.close();
        self.transition(LifecycleState::Closed);
    }

    pub fn deinit(&mut self) {
        if self.deinit_called {
            return;
        }
        self.close();
        self.deinit_called = true;
        self.capability.deinit();
        self.transition(LifecycleState::Deinitialized);
    }

    // --- 소스 ---

    /// `Opened`가 아니면 플러그인을 호출하지 않고 `NotConnected`입니다.
    pub fn read_message(&mut self, msg: &Message) -> ReadResult {
        if self.state != LifecycleState::Opened {
            return ReadResult::NotConnected;
        }
        match &mut self.capability {
            Capability::Source(p) => p.read_message(msg),
            Capability::TrackedSource(p) => p.read_message(msg),
            _ => {
                self.unsupported("read_message");
                ReadResult::NothingToRead
            }
        }
    }

    pub fn is_readable(&self) -> bool {
        if self.state != LifecycleState::Opened {
            return false;
        }
        match &self.capability {
            Capability::Source(p) => p.is_readable(),
            Capability::TrackedSource(p) => p.is_readable(),
            Capability::Reader(p) => p.is_readable(),
            _ => false,
        }
    }

    pub fn ack_handle(&self) -> Option<AckHandle> {
        match &self.capability {
            Capability::Source(p) => Some(p.ack_handle()),
            Capability::TrackedSource(p) => Some(p.ack_handle()),
            _ => None,
        }
    }

    pub fn stats_instance(&self) -> Option<&str> {
        match &self.capability {
            Capability::Source(p) => Some(p.stats_instance()),
            Capability::TrackedSource(p) => Some(p.stats_instance()),
            _ => None,
        }
    }

    /// 영속 저장소 키 (소스: persist name, 리더/목적지: 고유 옵션 이름)
    pub fn persist_name(&self) -> Option<String> {
        match &self.capability {
            Capability::Source(p) => Some(p.persist_name().to_owned()),
            Capability::TrackedSource(p) => Some(p.persist_name().to_owned()),
            Capability::Reader(p) => Some(p.name_by_uniq_options()),
            Capability::Destination(p) => Some(p.name_by_uniq_options()),
            _ => None,
        }
    }

    /// 현재 cursor 또는 bookmark
    pub fn position(&self) -> Option<PositionToken> {
        match &self.capability {
            Capability::TrackedSource(p) => p.cursor(),
            Capability::Reader(p) => p.bookmark(),
            _ => None,
        }
    }

    /// 저장된 위치로 재개합니다. `Initialized` 또는 `Closed`에서만 허용됩니다.
    pub fn resume(&mut self, saved: Option<&PositionToken>) -> ResumeOutcome {
        if !matches!(
            self.state,
            LifecycleState::Initialized | LifecycleState::Closed
        ) {
            self.reject("resume");
            return ResumeOutcome::Default;
        }
        match &mut self.capability {
            Capability::TrackedSource(p) => p.resume(saved),
            Capability::Reader(p) => p.resume(saved),
            _ => ResumeOutcome::Default,
        }
    }

    // --- 리더 ---

    pub fn fetch(&mut self, msg: &Message) -> bool {
        if self.state != LifecycleState::Opened {
            return false;
        }
        match &mut self.capability {
            Capability::Reader(p) => p.fetch(msg),
            _ => {
                self.unsupported("fetch");
                false
            }
        }
    }

    /// 최대 `limit`개를 가져옵니다. 리더가 아니거나 열려 있지 않으면 빈 결과입니다.
    pub fn fetch_batch(&mut self, limit: usize) -> FetchBatch {
        if self.state != LifecycleState::Opened {
            return FetchBatch::default();
        }
        match &mut self.capability {
            Capability::Reader(p) => p.fetch_batch(limit),
            _ => {
                self.unsupported("fetch_batch");
                FetchBatch::default()
            }
        }
    }

    /// 리더 폴링 조건: 열려 있고 읽을 수 있음
    ///
    /// `Opened`가 아니면 [`open`](Self::open)으로 먼저 열기 때문에 상태 전이가
    /// 기록되고, 이후 `fetch`가 그대로 동작합니다.
    pub fn check_source(&mut self) -> bool {
        if !matches!(self.capability, Capability::Reader(_)) {
            self.unsupported("check_source");
            return false;
        }
        if self.state != LifecycleState::Opened && !self.open() {
            return false;
        }
        match &mut self.capability {
            Capability::Reader(p) => p.check_source(),
            _ => false,
        }
    }

    // --- 필터 / 파서 / 리라이터 ---

    /// 필터 평가. 메시지 참조는 결과와 관계없이 해제됩니다.
    pub fn eval(&mut self, msg: Message) -> bool {
        if !self.is_active() {
            return false;
        }
        match &mut self.capability {
            Capability::Filter(p) => p.eval(msg),
            _ => {
                self.unsupported("eval");
                false
            }
        }
    }

    pub fn parse(&mut self, msg: &Message, input: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        match &mut self.capability {
            Capability::Parser(p) => p.process(msg, input),
            _ => {
                self.unsupported("parse");
                false
            }
        }
    }

    pub fn rewrite(&mut self, msg: &Message) -> bool {
        if !self.is_active() {
            return false;
        }
        match &mut self.capability {
            Capability::Rewriter(p) => p.process(msg),
            _ => {
                self.unsupported("rewrite");
                false
            }
        }
    }

    // --- 목적지 ---

    pub fn send(&mut self, payload: &str) -> bool {
        if self.state != LifecycleState::Opened {
            self.guard.report(
                DiagnosticSeverity::Error,
                "send",
                format!("destination is {}", self.state),
            );
            return false;
        }
        match &mut self.capability {
            Capability::Destination(p) => p.send(payload),
            _ => {
                self.unsupported("send");
                false
            }
        }
    }

    // --- 내부 ---

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Initialized | LifecycleState::Opened
        )
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(
            instance = %self.id,
            kind = %self.kind(),
            from = %self.state,
            to = %next,
            "lifecycle transition"
        );
        metrics::counter!(
            m::LIFECYCLE_TRANSITIONS_TOTAL,
            m::LABEL_KIND => self.kind().as_str(),
            m::LABEL_STATE => next.as_str()
        )
        .increment(1);
        self.state = next;
    }

    fn reject(&self, operation: &str) {
        let err = PluginError::InvalidState {
            operation: operation.to_owned(),
            state: self.state.to_string(),
        };
        self.guard.report(err.severity(), operation, err.to_string());
    }

    fn unsupported(&self, operation: &str) {
        self.guard.report(
            DiagnosticSeverity::Error,
            operation,
            format!("operation not supported by {} capability", self.kind()),
        );
    }
}

impl Drop for CapabilityInstance {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl fmt::Debug for CapabilityInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityInstance")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .finish()
    }
}
