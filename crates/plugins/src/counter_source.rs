//! 위치 추적 카운터 소스
//!
//! 1부터 증가하는 번호를 `message #N`으로 내보냅니다. cursor는 그 이하의
//! 번호가 모두 전달 완료된 위치입니다. 재전달 대기 중인 번호가 있으면 그중
//! 가장 작은 번호 바로 앞에서 멈추므로, 저장된 cursor로 재개하면 nack된
//! 번호를 건너뛰지 않습니다.
//!
//! | 옵션 | 기본값 | 설명 |
//! |---|---|---|
//! | `min-interval-ms` | `1000` | 성공 읽기 후 다시 읽을 수 있을 때까지의 간격 |
//! | `limit` | 없음 | 내보낼 최대 번호. 도달하면 `NothingToRead` |
//!
//! 잘못된 cursor로 이동하면 처음(번호 1)부터 다시 읽습니다.
//! nack된 번호는 다음 읽기에서 다시 전달됩니다.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ironhook_contract::{
    Acknowledge, Lifecycle, PluginError, PositionTracking, ReadResult, Source,
};
use ironhook_core::message::{MESSAGE_FIELD, Message};
use ironhook_core::options::OptionLookup;
use ironhook_core::position::PositionToken;

use crate::clock::{Clock, ReadThrottle, SystemClock};

/// 클래스 이름
pub const CLASS: &str = "CounterSource";

/// 번호가 저장되는 필드
pub const SEQ_FIELD: &str = "seq";

/// ack/nack 기록
///
/// 소스와 acknowledger가 공유합니다.
#[derive(Debug, Default)]
pub struct AckLedger {
    acked: AtomicU64,
    nacked: AtomicU64,
    redeliver: Mutex<VecDeque<u64>>,
}

impl AckLedger {
    pub fn acked(&self) -> u64 {
        self.acked.load(Ordering::SeqCst)
    }

    pub fn nacked(&self) -> u64 {
        self.nacked.load(Ordering::SeqCst)
    }

    /// 재전달 대기 중인 번호 수
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<u64>> {
        self.redeliver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Acknowledge for AckLedger {
    fn ack(&self, _msg: &Message) -> Result<(), PluginError> {
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn nack(&self, msg: &Message) -> Result<(), PluginError> {
        let seq = seq_of(msg)?;
        self.nacked.fetch_add(1, Ordering::SeqCst);
        self.queue().push_back(seq);
        tracing::debug!(class = CLASS, seq, "message queued for redelivery");
        Ok(())
    }
}

fn seq_of(msg: &Message) -> Result<u64, PluginError> {
    msg.get_value(SEQ_FIELD)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| PluginError::Fault(format!("message has no numeric '{SEQ_FIELD}' field")))
}

/// 위치 추적 카운터 소스
#[derive(Debug)]
pub struct CounterSource {
    emitted: u64,
    limit: Option<u64>,
    opened: bool,
    throttle: ReadThrottle,
    ledger: Arc<AckLedger>,
}

impl CounterSource {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            emitted: 0,
            limit: None,
            opened: false,
            throttle: ReadThrottle::with_clock(clock),
            ledger: Arc::default(),
        }
    }

    /// ack/nack 기록
    pub fn ledger(&self) -> Arc<AckLedger> {
        Arc::clone(&self.ledger)
    }

    /// 지금까지 새로 내보낸 번호 수
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn next_seq(&mut self) -> Option<u64> {
        if let Some(seq) = self.ledger.queue().pop_front() {
            return Some(seq);
        }
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return None;
        }
        self.emitted = self.emitted.checked_add(1)?;
        Some(self.emitted)
    }
}

impl Default for CounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for CounterSource {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        self.throttle.configure(options)?;
        self.limit = options.parse::<u64>("limit")?;
        tracing::debug!(
            class = CLASS,
            min_interval_ms = self.throttle.min_interval().as_millis() as u64,
            limit = ?self.limit,
            "init"
        );
        Ok(())
    }
}

impl Source for CounterSource {
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
        let Some(seq) = self.next_seq() else {
            return Ok(ReadResult::NothingToRead);
        };
        msg.set_value(SEQ_FIELD, seq.to_string())?;
        msg.set_value(MESSAGE_FIELD, format!("message #{seq}"))?;
        self.throttle.mark_read();
        Ok(ReadResult::Success)
    }

    fn is_readable(&self) -> bool {
        self.throttle.is_ready()
    }

    fn stats_instance(&self) -> Option<String> {
        Some(CLASS.to_owned())
    }

    fn acknowledger(&self) -> Arc<dyn Acknowledge> {
        self.ledger()
    }
}

impl PositionTracking for CounterSource {
    fn cursor(&self) -> Result<PositionToken, PluginError> {
        let settled = self
            .ledger
            .queue()
            .iter()
            .min()
            .map_or(self.emitted, |seq| seq.saturating_sub(1));
        PositionToken::new(settled.to_string()).map_err(|e| PluginError::Fault(e.to_string()))
    }

    /// 대기 중인 재전달은 이동할 때마다 버립니다.
    fn seek_to_cursor(&mut self, cursor: &PositionToken) -> Result<(), PluginError> {
        self.ledger.queue().clear();
        match cursor.as_str().parse::<u64>() {
            Ok(emitted) => {
                self.emitted = emitted;
                Ok(())
            }
            Err(e) => {
                self.emitted = 0;
                Err(PluginError::invalid_position(cursor.as_str(), e.to_string()))
            }
        }
    }
}
