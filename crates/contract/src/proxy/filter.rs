//! 필터 프록시 -- 평가 후 메시지 참조를 반드시 해제

use std::fmt;

use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;

use super::{deinit_plugin, init_plugin};
use crate::capability::Filter;
use crate::containment::Containment;

/// 필터 격리 프록시
///
/// [`FilterProxy::eval`]은 참조를 값으로 받습니다. 반환 시점에 그 참조는
/// 결과와 관계없이 정확히 한 번 해제되어 있습니다.
pub struct FilterProxy<F: ?Sized + Filter> {
    plugin: Box<F>,
    guard: Containment,
}

impl<F: ?Sized + Filter> FilterProxy<F> {
    pub fn new(plugin: Box<F>, guard: Containment) -> Self {
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

    /// 메시지를 평가하고 참조를 해제합니다. 실패하면 `false`입니다.
    pub fn eval(&mut self, mut msg: Message) -> bool {
        let matched = self
            .guard
            .guard("eval", false, || self.plugin.eval(&mut msg));
        if !msg.is_released() {
            // 플러그인이 해제하지 않은 참조
            let _ = msg.release();
        }
        matched
    }
}

impl<F: ?Sized + Filter> fmt::Debug for FilterProxy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterProxy")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}
