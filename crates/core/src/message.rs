//! 메시지 -- 파이프라인을 흐르는 참조 카운트 레코드
//!
//! [`LogRecord`]는 호스트가 소유하는 레코드이며, [`Message`]는 그 레코드에
//! 대한 참조 하나입니다. 참조는 정확히 한 번 해제되어야 합니다.
//!
//! - [`Message::release`]는 참조를 0으로 만들고, 두 번째 호출은
//!   [`MessageError::AlreadyReleased`]를 반환합니다.
//! - 해제된 참조로 쓰기를 시도하면 [`MessageError::Released`]입니다.
//!   읽기는 `None`/`false`를 반환합니다.
//! - 해제되지 않은 참조가 drop되면 그 시점에 해제됩니다.
//!
//! 호스트는 [`Message::record`]로 레코드를 관찰하여 해제 횟수를 검증할 수
//! 있습니다.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MessageError;
use crate::metrics as m;

/// 레코드의 기본 텍스트 페이로드 필드
pub const MESSAGE_FIELD: &str = "MSG";

#[derive(Debug, Default)]
struct RecordBody {
    fields: HashMap<String, String>,
    tags: HashSet<String>,
}

/// 호스트 소유 로그 레코드
#[derive(Debug)]
pub struct LogRecord {
    id: Uuid,
    body: RwLock<RecordBody>,
    live_refs: AtomicUsize,
    releases: AtomicUsize,
}

impl LogRecord {
    /// 레코드 id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 아직 해제되지 않은 참조 수
    pub fn live_refs(&self) -> usize {
        self.live_refs.load(Ordering::Acquire)
    }

    /// 지금까지 해제된 참조 수
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }
}

// ─── Message ─────────────────────────────────────────────────────────

/// 레코드에 대한 참조 하나
///
/// `Clone`을 구현하지 않습니다. 추가 참조는 [`Message::share`]로 얻으며,
/// 얻은 참조마다 해제 의무가 생깁니다.
pub struct Message {
    record: Option<Arc<LogRecord>>,
}

impl Message {
    /// 새 레코드와 첫 참조를 생성합니다.
    pub fn new() -> Self {
        let record = LogRecord {
            id: Uuid::new_v4(),
            body: RwLock::new(RecordBody::default()),
            live_refs: AtomicUsize::new(1),
            releases: AtomicUsize::new(0),
        };
        Self {
            record: Some(Arc::new(record)),
        }
    }

    /// 주 페이로드(`MSG`)를 가진 메시지를 생성합니다.
    pub fn with_text(text: impl Into<String>) -> Self {
        let msg = Self::new();
        if let Some(record) = &msg.record {
            write_body(record).fields.insert(MESSAGE_FIELD.to_owned(), text.into());
        }
        msg
    }

    /// 같은 레코드에 대한 참조를 하나 더 얻습니다.
    pub fn share(&self) -> Result<Message, MessageError> {
        let record = self.record.as_ref().ok_or(MessageError::Released)?;
        record.live_refs.fetch_add(1, Ordering::AcqRel);
        Ok(Self {
            record: Some(Arc::clone(record)),
        })
    }

    /// 참조를 해제합니다.
    pub fn release(&mut self) -> Result<(), MessageError> {
        let record = self.record.take().ok_or(MessageError::AlreadyReleased)?;
        record.live_refs.fetch_sub(1, Ordering::AcqRel);
        record.releases.fetch_add(1, Ordering::AcqRel);
        metrics::counter!(m::MESSAGES_RELEASED_TOTAL).increment(1);
        Ok(())
    }

    /// 참조가 해제되었는지 여부
    pub fn is_released(&self) -> bool {
        self.record.is_none()
    }

    /// 레코드 관찰용 포인터 (해제 횟수 검증 등)
    ///
    /// 반환된 포인터는 참조로 계산되지 않습니다.
    pub fn record(&self) -> Option<Arc<LogRecord>> {
        self.record.clone()
    }

    /// 레코드 id
    pub fn id(&self) -> Option<Uuid> {
        self.record.as_ref().map(|r| r.id)
    }

    /// 필드 값을 조회합니다.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let record = self.record.as_ref()?;
        read_body(record).fields.get(key).cloned()
    }

    /// 필드 값을 설정합니다. 같은 키의 기존 값은 대체됩니다.
    pub fn set_value(&self, key: &str, value: impl Into<String>) -> Result<(), MessageError> {
        let record = self.record.as_ref().ok_or(MessageError::Released)?;
        write_body(record).fields.insert(key.to_owned(), value.into());
        Ok(())
    }

    /// 필드를 제거하고 이전 값을 반환합니다.
    pub fn unset_value(&self, key: &str) -> Result<Option<String>, MessageError> {
        let record = self.record.as_ref().ok_or(MessageError::Released)?;
        Ok(write_body(record).fields.remove(key))
    }

    /// 태그를 켜거나 끕니다.
    pub fn set_tag(&self, tag: &str, on: bool) -> Result<(), MessageError> {
        let record = self.record.as_ref().ok_or(MessageError::Released)?;
        let mut body = write_body(record);
        if on {
            body.tags.insert(tag.to_owned());
        } else {
            body.tags.remove(tag);
        }
        Ok(())
    }

    /// 태그 존재 여부
    pub fn has_tag(&self, tag: &str) -> bool {
        self.record
            .as_ref()
            .is_some_and(|r| read_body(r).tags.contains(tag))
    }

    /// 필드 수
    pub fn field_count(&self) -> usize {
        self.record
            .as_ref()
            .map_or(0, |r| read_body(r).fields.len())
    }

    /// 현재 내용을 정렬된 스냅샷으로 복사합니다.
    pub fn snapshot(&self) -> Result<MessageSnapshot, MessageError> {
        let record = self.record.as_ref().ok_or(MessageError::Released)?;
        let body = read_body(record);
        Ok(MessageSnapshot {
            id: record.id.to_string(),
            fields: body
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            tags: body.tags.iter().cloned().collect(),
        })
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        if self.record.is_some() {
            let _ = self.release();
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            Some(record) => f
                .debug_struct("Message")
                .field("id", &record.id)
                .field("live_refs", &record.live_refs())
                .finish(),
            None => f.write_str("Message(released)"),
        }
    }
}

fn read_body(record: &LogRecord) -> std::sync::RwLockReadGuard<'_, RecordBody> {
    record.body.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_body(record: &LogRecord) -> std::sync::RwLockWriteGuard<'_, RecordBody> {
    record.body.write().unwrap_or_else(PoisonError::into_inner)
}

/// 메시지 내용의 직렬화 가능한 복사본
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    /// 레코드 id
    pub id: String,
    /// 필드 (키 순 정렬)
    pub fields: BTreeMap<String, String>,
    /// 태그 (이름 순 정렬)
    pub tags: BTreeSet<String>,
}
