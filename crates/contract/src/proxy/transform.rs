//! 파서/리라이터 프록시
//!
//! 두 capability 모두 메시지를 공유 참조로만 받습니다. 해제 책임은
//! 호출한 호스트에 남습니다.

use std::fmt;

use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;

use super::{deinit_plugin, init_plugin};
use crate::capability::{Parser, Rewriter};
use crate::containment::Containment;

/// 파서 격리 프록시
pub struct ParserProxy<P: ?Sized + Parser> {
    plugin: Box<P>,
    guard: Containment,
}

impl<P: ?Sized + Parser> ParserProxy<P> {
    pub fn new(plugin: Box<P>, guard: Containment) -> Self {
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

    /// `input`을 해석해 `msg`에 반영합니다. 실패하면 `false`입니다.
    pub fn process(&mut self, msg: &Message, input: &str) -> bool {
        self.guard
            .guard("process", false, || self.plugin.process(msg, input))
    }
}

impl<P: ?Sized + Parser> fmt::Debug for ParserProxy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserProxy")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}

/// 리라이터 격리 프록시
pub struct RewriterProxy<W: ?Sized + Rewriter> {
    plugin: Box<W>,
    guard: Containment,
}

impl<W: ?Sized + Rewriter> RewriterProxy<W> {
    pub fn new(plugin: Box<W>, guard: Containment) -> Self {
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

    pub fn process(&mut self, msg: &Message) -> bool {
        self.guard.guard("process", false, || self.plugin.process(msg))
    }
}

impl<W: ?Sized + Rewriter> fmt::Debug for RewriterProxy<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriterProxy")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}
