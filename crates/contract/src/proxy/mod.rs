//! 격리 프록시 -- capability별 호스트 측 진입점
//!
//! 프록시는 플러그인 객체를 소유하고 모든 호출을
//! [`Containment`](crate::containment::Containment)로 감쌉니다. 호스트는
//! 플러그인 trait을 직접 호출하지 않고 프록시의 센티널 반환값만 봅니다.
//!
//! | 연산 실패 시 | 센티널 |
//! |---|---|
//! | `open`, `fetch`, `eval`, `process`, `send`, `seek_*` | `false` |
//! | `read_message` | [`ReadResult::NothingToRead`](crate::capability::ReadResult) |
//! | `cursor`, `bookmark` | `None` |
//! | `stats_instance`, `persist_name` | 기본 이름 |

mod destination;
mod filter;
mod reader;
mod source;
mod transform;

pub use destination::DestinationProxy;
pub use filter::FilterProxy;
pub use reader::{FetchBatch, ReaderProxy};
pub use source::{AckHandle, DEFAULT_STATS_INSTANCE, SourceProxy};
pub use transform::{ParserProxy, RewriterProxy};

use ironhook_core::options::OptionLookup;
use serde::{Deserialize, Serialize};

use crate::capability::Lifecycle;
use crate::containment::Containment;

/// 저장된 위치로 재개한 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeOutcome {
    /// 저장된 위치가 없어 기본 위치에서 시작
    Default,
    /// 저장된 위치로 복원
    Restored,
    /// 저장된 위치로 이동하지 못해 기본 위치로 대체
    FellBack,
}

fn init_plugin<P: ?Sized + Lifecycle>(
    guard: &Containment,
    plugin: &mut P,
    options: &OptionLookup,
) -> bool {
    guard.guard_void("init", || plugin.init(options))
}

fn deinit_plugin<P: ?Sized + Lifecycle>(guard: &Containment, plugin: &mut P) {
    guard.guard_void("deinit", || {
        plugin.deinit();
        Ok(())
    });
}
