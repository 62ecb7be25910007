//! 시계와 읽기 속도 제한
//!
//! 소스와 리더의 `is_readable`은 마지막 성공 읽기 이후 최소 간격이 지나야
//! 다시 `true`가 됩니다. 테스트에서는 [`ManualClock`]으로 시간을 직접
//! 움직입니다.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use ironhook_contract::PluginError;
use ironhook_core::options::OptionLookup;

/// 읽기 간격 옵션 키
pub const MIN_INTERVAL_OPTION: &str = "min-interval-ms";

/// 기본 최소 읽기 간격 (밀리초)
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;

/// 단조 시계
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 실제 시간
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 수동으로 진행하는 시계
///
/// 복제본은 같은 시간을 공유합니다.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::default(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        self.origin + elapsed
    }
}

/// 마지막 성공 읽기 기준의 속도 제한
///
/// 한 번도 읽지 않았으면 바로 읽을 수 있습니다.
pub struct ReadThrottle {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_read: Option<Instant>,
}

impl ReadThrottle {
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_read: None,
        }
    }

    /// 기본 간격(1초)을 사용합니다.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Duration::from_millis(DEFAULT_MIN_INTERVAL_MS))
    }

    /// `min-interval-ms` 옵션을 읽어 간격을 설정합니다.
    pub fn configure(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        let ms = options
            .parse::<u64>(MIN_INTERVAL_OPTION)?
            .unwrap_or(DEFAULT_MIN_INTERVAL_MS);
        self.min_interval = Duration::from_millis(ms);
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 지금 읽을 수 있는지 여부
    pub fn is_ready(&self) -> bool {
        match self.last_read {
            None => true,
            Some(last) => self.clock.now().saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// 성공한 읽기를 기록합니다.
    pub fn mark_read(&mut self) {
        self.last_read = Some(self.clock.now());
    }

    pub fn reset(&mut self) {
        self.last_read = None;
    }
}

impl Default for ReadThrottle {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl fmt::Debug for ReadThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadThrottle")
            .field("min_interval", &self.min_interval)
            .field("last_read", &self.last_read)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ironhook_core::options::{OptionTable, lookup_for};

    use super::*;

    fn throttle(ms: u64) -> (ManualClock, ReadThrottle) {
        let clock = ManualClock::new();
        let throttle = ReadThrottle::new(Arc::new(clock.clone()), Duration::from_millis(ms));
        (clock, throttle)
    }

    #[test]
    fn cold_start_is_ready() {
        let (_, throttle) = throttle(1000);
        assert!(throttle.is_ready());
    }

    #[test]
    fn ready_again_after_interval() {
        let (clock, mut throttle) = throttle(1000);
        throttle.mark_read();
        assert!(!throttle.is_ready());
        clock.advance(Duration::from_millis(999));
        assert!(!throttle.is_ready());
        clock.advance(Duration::from_millis(1));
        assert!(throttle.is_ready());
    }

    #[test]
    fn zero_interval_is_always_ready() {
        let (_, mut throttle) = throttle(0);
        throttle.mark_read();
        assert!(throttle.is_ready());
    }

    #[test]
    fn configure_reads_option() {
        let table = Arc::new(OptionTable::new());
        let handle = table.register([("min_interval_ms", "250")]);
        let (_, mut throttle) = throttle(1000);
        throttle.configure(&lookup_for(&table, handle)).unwrap();
        assert_eq!(throttle.min_interval(), Duration::from_millis(250));

        table.set(handle, "min-interval-ms", "soon").unwrap();
        assert!(throttle.configure(&lookup_for(&table, handle)).is_err());
    }

    #[test]
    fn configure_defaults_when_absent() {
        let table = Arc::new(OptionTable::new());
        let handle = table.register(std::iter::empty::<(&str, &str)>());
        let (_, mut throttle) = throttle(5);
        throttle.configure(&lookup_for(&table, handle)).unwrap();
        assert_eq!(
            throttle.min_interval(),
            Duration::from_millis(DEFAULT_MIN_INTERVAL_MS)
        );
    }
}
