//! 메트릭 상수 및 설명 등록
//!
//! 계약 계층이 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 레코더 설치는 호스트의 몫이며, 설치되지 않은 상태에서도
//! `metrics::counter!()` 호출은 안전합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironhook_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// capability 종류 레이블 키 (source, reader, filter, ...)
pub const LABEL_KIND: &str = "kind";

/// 연산 이름 레이블 키 (open, read_message, eval, ...)
pub const LABEL_OPERATION: &str = "operation";

/// 실패 원인 레이블 키 (error, panic)
pub const LABEL_CAUSE: &str = "cause";

/// 생명주기 상태 레이블 키
pub const LABEL_STATE: &str = "state";

/// 읽기 결과 레이블 키 (success, nothing_to_read, not_connected)
pub const LABEL_RESULT: &str = "result";

// ─── 계약 계층 메트릭 ──────────────────────────────────────────────

/// 격리된 플러그인 실패 수 (counter, labels: kind, operation, cause)
pub const CONTAINED_FAILURES_TOTAL: &str = "ironhook_contained_failures_total";

/// 생명주기 전이 수 (counter, labels: kind, state)
pub const LIFECYCLE_TRANSITIONS_TOTAL: &str = "ironhook_lifecycle_transitions_total";

/// 소스 읽기 결과 수 (counter, labels: kind, result)
pub const SOURCE_READS_TOTAL: &str = "ironhook_source_reads_total";

/// ack/nack 수 (counter, label: result = ack | nack)
pub const SOURCE_ACKS_TOTAL: &str = "ironhook_source_acks_total";

/// 해제된 메시지 참조 수 (counter)
pub const MESSAGES_RELEASED_TOTAL: &str = "ironhook_messages_released_total";

/// 위치 복원 실패로 기본 위치를 사용한 횟수 (counter, label: kind)
pub const POSITION_FALLBACKS_TOTAL: &str = "ironhook_position_fallbacks_total";

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        CONTAINED_FAILURES_TOTAL,
        "Plugin failures caught at the containment boundary"
    );
    describe_counter!(
        LIFECYCLE_TRANSITIONS_TOTAL,
        "Lifecycle state transitions of capability instances"
    );
    describe_counter!(
        SOURCE_READS_TOTAL,
        "Source read attempts by result code"
    );
    describe_counter!(
        SOURCE_ACKS_TOTAL,
        "Acknowledgements delivered to sources"
    );
    describe_counter!(
        MESSAGES_RELEASED_TOTAL,
        "Message references released"
    );
    describe_counter!(
        POSITION_FALLBACKS_TOTAL,
        "Resume attempts that fell back to the default position"
    );
}
