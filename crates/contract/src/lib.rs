//! ironhook 플러그인 계약
//!
//! 호스트와 플러그인 사이의 경계를 정의합니다.
//!
//! - [`capability`]: 플러그인이 구현하는 capability trait
//! - [`containment`]: 플러그인 실패를 센티널 값으로 바꾸는 격리 경계
//! - [`proxy`]: capability별 호스트 측 진입점
//! - [`instance`]: 생명주기 상태 머신
//! - [`registry`]: 클래스 이름 기반 플러그인 생성
//!
//! # 호출 흐름
//! ```text
//! host ─→ CapabilityInstance (상태 검사)
//!           └─→ *Proxy (센티널 변환)
//!                 └─→ Containment::guard (catch_unwind + 진단)
//!                       └─→ plugin trait 구현
//! ```

pub mod capability;
pub mod containment;
pub mod error;
pub mod instance;
pub mod proxy;
pub mod registry;

pub use capability::{
    Acknowledge, CapabilityKind, Destination, Filter, IgnoreAcks, Lifecycle, Parser,
    PluginObject, PositionTracking, ReadResult, Reader, Rewriter, Source, TrackedSource,
};
pub use containment::Containment;
pub use error::{PluginError, RegistryError};
pub use instance::{Capability, CapabilityInstance, LifecycleState};
pub use proxy::{AckHandle, FetchBatch, ResumeOutcome};
pub use registry::{ConfiguredInstance, InstanceSet, PluginFactory, PluginInfo, PluginRegistry};
