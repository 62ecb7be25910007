//! 카운터 리더
//!
//! `fetch`마다 `{prefix} #N`을 `MSG`에 채웁니다. bookmark는 지금까지 가져온
//! 개수(10진수)입니다. 숫자가 아닌 bookmark는 거부되며 위치는 바뀌지
//! 않습니다.

use std::sync::Arc;

use ironhook_contract::{Lifecycle, PluginError, Reader};
use ironhook_core::message::{MESSAGE_FIELD, Message};
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;

use crate::clock::{Clock, ReadThrottle, SystemClock};

pub const CLASS: &str = "CounterReader";

const DEFAULT_PREFIX: &str = "message";

#[derive(Debug)]
pub struct CounterReader {
    fetched: u64,
    prefix: String,
    opened: bool,
    throttle: ReadThrottle,
}

impl CounterReader {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            fetched: 0,
            prefix: DEFAULT_PREFIX.to_owned(),
            opened: false,
            throttle: ReadThrottle::with_clock(clock),
        }
    }

    /// 지금까지 가져온 개수
    pub fn fetched(&self) -> u64 {
        self.fetched
    }
}

impl Default for CounterReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for CounterReader {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        self.throttle.configure(options)?;
        self.prefix = options.get_or("prefix", DEFAULT_PREFIX);
        Ok(())
    }
}

impl Reader for CounterReader {
    fn open(&mut self) -> Result<(), PluginError> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PluginError> {
        self.opened = false;
        Ok(())
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn fetch(&mut self, msg: &Message) -> Result<bool, PluginError> {
        if !self.opened {
            return Ok(false);
        }
        let Some(n) = self.fetched.checked_add(1) else {
            return Ok(false);
        };
        msg.set_value(MESSAGE_FIELD, format!("{} #{n}", self.prefix))?;
        self.fetched = n;
        self.throttle.mark_read();
        Ok(true)
    }

    fn is_readable(&self) -> bool {
        self.throttle.is_ready()
    }

    fn bookmark(&self) -> Result<PositionToken, PluginError> {
        PositionToken::new(self.fetched.to_string()).map_err(|e| PluginError::Fault(e.to_string()))
    }

    fn seek_to_bookmark(&mut self, bookmark: &PositionToken) -> Result<(), PluginError> {
        let fetched = bookmark
            .as_str()
            .parse::<u64>()
            .map_err(|e| PluginError::invalid_position(bookmark.as_str(), e.to_string()))?;
        tracing::debug!(class = CLASS, from = self.fetched, to = fetched, "seek to bookmark");
        self.fetched = fetched;
        Ok(())
    }

    fn name_by_uniq_options(&self) -> String {
        format!("{CLASS}({})", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use ironhook_core::options::{OptionTable, lookup_for};

    use super::*;

    fn opened(prefix: Option<&str>) -> CounterReader {
        let table = Arc::new(OptionTable::new());
        let handle = table.register(prefix.map(|p| ("prefix", p)));
        let mut reader = CounterReader::new();
        reader.init(&lookup_for(&table, handle)).unwrap();
        reader.open().unwrap();
        reader
    }

    #[test]
    fn fetch_uses_prefix() {
        let mut reader = opened(Some("tick"));
        let msg = Message::new();
        assert!(reader.fetch(&msg).unwrap());
        assert_eq!(msg.get_value(MESSAGE_FIELD).as_deref(), Some("tick #1"));
        assert_eq!(reader.name_by_uniq_options(), "CounterReader(tick)");
    }

    #[test]
    fn bookmark_roundtrip() {
        let mut reader = opened(None);
        for _ in 0..3 {
            reader.fetch(&Message::new()).unwrap();
        }
        let bookmark = reader.bookmark().unwrap();

        let mut resumed = opened(None);
        resumed.seek_to_bookmark(&bookmark).unwrap();
        let msg = Message::new();
        resumed.fetch(&msg).unwrap();
        assert_eq!(msg.get_value(MESSAGE_FIELD).as_deref(), Some("message #4"));
    }

    #[test]
    fn malformed_bookmark_keeps_position() {
        let mut reader = opened(None);
        reader.fetch(&Message::new()).unwrap();
        let bad = PositionToken::new("not-a-number").unwrap();
        let err = reader.seek_to_bookmark(&bad).unwrap_err();
        assert!(matches!(err, PluginError::InvalidPosition { .. }));
        assert_eq!(reader.fetched(), 1);
    }

    #[test]
    fn closed_reader_fetches_nothing() {
        let mut reader = CounterReader::new();
        assert!(!reader.fetch(&Message::new()).unwrap());
    }
}
