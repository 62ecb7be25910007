//! 핸들 -- 호스트 소유 객체에 대한 불투명 참조
//!
//! [`Handle`]은 식별자일 뿐이며 역참조 연산을 제공하지 않습니다.
//! 호스트는 [`HandleTable`]로 핸들을 실제 객체에 매핑합니다.
//!
//! # 인코딩
//! ```text
//! raw = (generation << 32) | (slot index + 1)
//! ```
//! 하위 32비트가 0이 될 수 없으므로 `0`은 항상 NULL 핸들입니다.
//! 슬롯이 재사용되면 세대가 증가하므로, 해제된 핸들은 다시 해석되지 않습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HandleError;

/// 호스트 소유 객체의 불투명 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// 어떤 객체도 가리키지 않는 핸들
    pub const NULL: Handle = Handle(0);

    /// 원시 값에서 핸들을 복원합니다.
    ///
    /// 호스트 경계를 넘어 전달된 값을 되돌릴 때만 사용합니다.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// 원시 값
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// NULL 핸들 여부
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// 핸들을 무효화합니다. 이후 어떤 테이블에서도 해석되지 않습니다.
    pub fn release(&mut self) {
        self.0 = 0;
    }

    fn from_parts(index: usize, generation: u32) -> Self {
        // index는 u32 범위로 제한된다 (HandleTable::insert)
        Self((u64::from(generation) << 32) | (index as u64 + 1))
    }

    fn parts(self) -> Option<(usize, u32)> {
        let low = (self.0 & 0xFFFF_FFFF) as u32;
        if low == 0 {
            return None;
        }
        Some(((low - 1) as usize, (self.0 >> 32) as u32))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{:x}", self.0)
    }
}

// ─── HandleTable ─────────────────────────────────────────────────────

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// 세대 검사 기반 핸들 아레나
///
/// 핸들을 호스트 객체에 매핑합니다. 제거된 슬롯은 재사용되지만
/// 세대가 증가하므로 이전 핸들로는 새 객체에 접근할 수 없습니다.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> HandleTable<T> {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// 값을 저장하고 새 핸들을 반환합니다.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(value);
            return Handle::from_parts(index, slot.generation);
        }

        let index = self.slots.len();
        assert!(index < u32::MAX as usize, "handle table exhausted");
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        Handle::from_parts(index, 1)
    }

    /// 핸들이 가리키는 값을 조회합니다.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let (index, generation) = handle.parts()?;
        let slot = self.slots.get(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// 핸들이 가리키는 값을 가변 조회합니다.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let (index, generation) = handle.parts()?;
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// 핸들이 유효한지 확인합니다.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// 값을 제거하고 소유권을 반환합니다.
    pub fn remove(&mut self, handle: Handle) -> Result<T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        let stale = HandleError::Stale {
            handle: handle.raw(),
        };
        let (index, generation) = handle.parts().ok_or(stale)?;
        let slot = self.slots.get_mut(index).ok_or(stale)?;
        if slot.generation != generation {
            return Err(stale);
        }
        let value = slot.value.take().ok_or(stale)?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(index);
        self.len -= 1;
        Ok(value)
    }

    /// 저장된 값의 수
    pub fn len(&self) -> usize {
        self.len
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleTable")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_resolves_nothing() {
        let table: HandleTable<&str> = HandleTable::new();
        assert!(Handle::NULL.is_null());
        assert!(table.get(Handle::NULL).is_none());
    }

    #[test]
    fn insert_and_get() {
        let mut table = HandleTable::new();
        let a = table.insert("alpha");
        let b = table.insert("beta");
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(table.get(a), Some(&"alpha"));
        assert_eq!(table.get(b), Some(&"beta"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn removed_handle_is_stale_after_slot_reuse() {
        let mut table = HandleTable::new();
        let old = table.insert(1);
        assert_eq!(table.remove(old).unwrap(), 1);

        let new = table.insert(2);
        assert_ne!(old, new);
        assert!(table.get(old).is_none());
        assert_eq!(table.get(new), Some(&2));
        assert_eq!(
            table.remove(old).unwrap_err(),
            HandleError::Stale { handle: old.raw() }
        );
    }

    #[test]
    fn release_zeroes_handle() {
        let mut table = HandleTable::new();
        let mut handle = table.insert("x");
        handle.release();
        assert!(handle.is_null());
        assert!(table.get(handle).is_none());
        assert_eq!(table.remove(handle).unwrap_err(), HandleError::Null);
    }

    #[test]
    fn get_mut_updates_value() {
        let mut table = HandleTable::new();
        let handle = table.insert(String::from("a"));
        table.get_mut(handle).unwrap().push('b');
        assert_eq!(table.get(handle).unwrap(), "ab");
    }

    #[test]
    fn forged_handle_does_not_resolve() {
        let mut table = HandleTable::new();
        let handle = table.insert(7);
        let forged = Handle::from_raw(handle.raw() + (1 << 32));
        assert!(table.get(forged).is_none());
        assert!(!table.contains(Handle::from_raw(0xFFFF)));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Handle::from_raw(0x1_0000_0001).to_string(), "handle#100000001");
    }
}
