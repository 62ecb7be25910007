//! 무작위 표본 필터
//!
//! 인스턴스마다 자기 RNG를 가집니다. `seed` 옵션이 있으면 결정적으로,
//! 없으면 OS 엔트로피로 초기화합니다.
//!
//! | 옵션 | 기본값 | 설명 |
//! |---|---|---|
//! | `name` | 인스턴스 로그용 이름 | |
//! | `seed` | 엔트로피 | RNG 시드 (u64) |
//! | `ratio` | `0.5` | 통과 확률 (0.0 ~ 1.0) |

use ironhook_contract::{Filter, Lifecycle, PluginError};
use ironhook_core::message::Message;
use ironhook_core::options::OptionLookup;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const CLASS: &str = "RandomFilter";

const DEFAULT_RATIO: f64 = 0.5;

#[derive(Debug)]
pub struct RandomFilter {
    name: Option<String>,
    ratio: f64,
    rng: StdRng,
}

impl RandomFilter {
    pub fn new() -> Self {
        Self {
            name: None,
            ratio: DEFAULT_RATIO,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Default for RandomFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle for RandomFilter {
    fn init(&mut self, options: &OptionLookup) -> Result<(), PluginError> {
        self.name = options.get("name");
        let ratio = options.parse::<f64>("ratio")?.unwrap_or(DEFAULT_RATIO);
        if !(0.0..=1.0).contains(&ratio) {
            return Err(PluginError::Config {
                key: "ratio".to_owned(),
                reason: format!("{ratio} is outside 0.0..=1.0"),
            });
        }
        self.ratio = ratio;
        self.rng = match options.parse::<u64>("seed")? {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(())
    }
}

impl Filter for RandomFilter {
    fn eval(&mut self, msg: &mut Message) -> Result<bool, PluginError> {
        tracing::debug!(
            class = CLASS,
            name = self.name.as_deref().unwrap_or_default(),
            "evaluating filter"
        );
        msg.release()?;
        Ok(self.rng.gen_bool(self.ratio))
    }
}
