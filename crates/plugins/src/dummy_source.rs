//! 고정 메시지를 내보내는 소스

use std::sync::Arc;

use ironhook_contract::{Acknowledge, Lifecycle, PluginError, ReadResult, Source};
use ironhook_core::message::{MESSAGE_FIELD, Message};
use ironhook_core::options::OptionLookup;

use crate::clock::{Clock, ReadThrottle, SystemClock};

/// 클래스 이름
pub const CLASS: &str = "DummySource";

/// 매 읽기마다 채우는 메시지 본문
pub const DUMMY_TEXT: &str = "THIS IS A MESSAGE";

/// `MSG`에 고정 문자열을 채우는 소스
///
/// 통계 이름은 `DummySource`, persist name은 `DummySourcePersistName`입니다.
#[derive(Debug)]
pub struct DummySource {
    throttle: ReadThrottle,
    opened: bool,
}

impl DummySource {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            throttle: ReadThrottle::with_clock(clock),
            opened: false,
        }
    }
}

impl Default for DummySource {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for DummySource {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        self.throttle.configure(options)?;
        tracing::debug!(class = CLASS, "init");
        Ok(())
    }

    fn deinit(&mut self) {
        tracing::debug!(class = CLASS, "deinit");
    }
}

impl Source for DummySource {
    fn open(&mut self) -> Result<(), PluginError> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PluginError> {
        self.opened = false;
        Ok(())
    }

    fn read_message(&mut self, msg: &Message) -> Result<ReadResult, PluginError> {
        if !self.opened {
            return Ok(ReadResult::NotConnected);
        }
        msg.set_value(MESSAGE_FIELD, DUMMY_TEXT)?;
        self.throttle.mark_read();
        Ok(ReadResult::Success)
    }

    fn is_readable(&self) -> bool {
        self.throttle.is_ready()
    }

    fn stats_instance(&self) -> Option<String> {
        Some(CLASS.to_owned())
    }

    fn persist_name(&self) -> Option<String> {
        Some("DummySourcePersistName".to_owned())
    }

    fn acknowledger(&self) -> Arc<dyn Acknowledge> {
        Arc::new(LogAcks)
    }
}

/// ack/nack을 로그로만 남깁니다.
struct LogAcks;

impl Acknowledge for LogAcks {
    fn ack(&self, msg: &Message) -> Result<(), PluginError> {
        tracing::debug!(class = CLASS, id = ?msg.id(), "ack");
        Ok(())
    }

    fn nack(&self, msg: &Message) -> Result<(), PluginError> {
        tracing::debug!(class = CLASS, id = ?msg.id(), "nack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ironhook_core::handle::Handle;
    use ironhook_core::options::OptionTable;

    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn reads_fixed_text_and_throttles() {
        let clock = ManualClock::new();
        let mut source = DummySource::with_clock(Arc::new(clock.clone()));
        source
            .init(&OptionLookup::new(Handle::NULL, Arc::new(OptionTable::new())))
            .unwrap();
        source.open().unwrap();

        assert!(source.is_readable());
        let msg = Message::new();
        assert_eq!(source.read_message(&msg).unwrap(), ReadResult::Success);
        assert_eq!(msg.get_value(MESSAGE_FIELD).as_deref(), Some(DUMMY_TEXT));
        assert!(!source.is_readable());

        clock.advance(Duration::from_secs(1));
        assert!(source.is_readable());
    }

    #[test]
    fn closed_source_is_not_connected() {
        let mut source = DummySource::new();
        let msg = Message::new();
        assert_eq!(source.read_message(&msg).unwrap(), ReadResult::NotConnected);
    }

    #[test]
    fn fixed_names() {
        let source = DummySource::new();
        assert_eq!(source.stats_instance().as_deref(), Some("DummySource"));
        assert_eq!(
            source.persist_name().as_deref(),
            Some("DummySourcePersistName")
        );
    }
}
