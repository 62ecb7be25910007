//! 목적지 프록시 -- 안전한 재열기, 멱등 close

use std::fmt;

use ironhook_core::diagnostics::DiagnosticSeverity;
use ironhook_core::options::OptionLookup;

use super::{deinit_plugin, init_plugin};
use crate::capability::Destination;
use crate::containment::Containment;

/// 목적지 격리 프록시
///
/// - `open`은 열린 자원을 먼저 닫습니다.
/// - `close`는 열려 있을 때만 플러그인에 전달됩니다.
/// - 닫힌 상태의 `send`는 진단을 남기고 `false`입니다.
pub struct DestinationProxy<D: ?Sized + Destination> {
    plugin: Box<D>,
    guard: Containment,
}

impl<D: ?Sized + Destination> DestinationProxy<D> {
    pub fn new(plugin: Box<D>, guard: Containment) -> Self {
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
        if self.is_opened() {
            self.close();
        }
        self.guard.guard_void("open", || self.plugin.open())
    }

    pub fn close(&mut self) {
        if self.is_opened() {
            self.guard.guard_void("close", || self.plugin.close());
        }
    }

    pub fn is_opened(&self) -> bool {
        self.guard
            .guard("is_opened", false, || Ok(self.plugin.is_opened()))
    }

    pub fn send(&mut self, payload: &str) -> bool {
        if !self.is_opened() {
            self.guard.report(
                DiagnosticSeverity::Error,
                "send",
                "destination is not opened",
            );
            return false;
        }
        self.guard.guard_void("send", || self.plugin.send(payload))
    }

    pub fn name_by_uniq_options(&self) -> String {
        self.guard
            .guard("get_name_by_uniq_options", None, || {
                Ok(Some(self.plugin.name_by_uniq_options()))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.guard.instance().to_owned())
    }
}

impl<D: ?Sized + Destination> fmt::Debug for DestinationProxy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationProxy")
            .field("instance", &self.guard.instance())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ironhook_core::diagnostics::MemorySink;

    use super::*;
    use crate::capability::{CapabilityKind, Lifecycle};
    use crate::error::PluginError;

    /// 열린 자원 수와 전송 내용을 기록하는 목적지
    #[derive(Default)]
    struct Recorder {
        open_resources: usize,
        opens: usize,
        closes: usize,
        sent: Vec<String>,
    }

    impl Lifecycle for Recorder {
        fn init(&mut self, _options: &OptionLookup) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl Destination for Recorder {
        fn open(&mut self) -> Result<(), PluginError> {
            self.opens += 1;
            self.open_resources += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<(), PluginError> {
            self.closes += 1;
            self.open_resources -= 1;
            Ok(())
        }

        fn is_opened(&self) -> bool {
            self.open_resources > 0
        }

        fn send(&mut self, payload: &str) -> Result<(), PluginError> {
            self.sent.push(payload.to_owned());
            Ok(())
        }

        fn name_by_uniq_options(&self) -> String {
            "Recorder".to_owned()
        }
    }

    fn proxy() -> (Arc<MemorySink>, DestinationProxy<Recorder>) {
        let sink = Arc::new(MemorySink::new());
        let guard = Containment::new("rec", CapabilityKind::Destination, sink.clone());
        (sink, DestinationProxy::new(Box::new(Recorder::default()), guard))
    }

    #[test]
    fn reopen_closes_first() {
        let (_, mut proxy) = proxy();
        assert!(proxy.open());
        assert!(proxy.open());
        assert_eq!(proxy.plugin.open_resources, 1);
        assert_eq!(proxy.plugin.opens, 2);
        assert_eq!(proxy.plugin.closes, 1);
    }

    #[test]
    fn close_is_idempotent() {
        let (_, mut proxy) = proxy();
        proxy.close();
        assert!(proxy.open());
        proxy.close();
        proxy.close();
        assert_eq!(proxy.plugin.closes, 1);
        assert_eq!(proxy.plugin.open_resources, 0);
    }

    #[test]
    fn send_after_close_fails() {
        let (sink, mut proxy) = proxy();
        assert!(proxy.open());
        assert!(proxy.send("one"));
        proxy.close();
        assert!(!proxy.send("two"));
        assert_eq!(proxy.plugin.sent, vec!["one"]);
        assert_eq!(sink.count_for("send"), 1);
    }

    #[test]
    fn name_comes_from_plugin() {
        let (_, proxy) = proxy();
        assert_eq!(proxy.name_by_uniq_options(), "Recorder");
    }
}
