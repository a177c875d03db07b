//! Beacon 도메인 모델.
//!
//! 메트릭 이벤트, 집계 결과, 알림, 빈도 제한, 예약 리포트 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다 (camelCase).

pub mod alert;
pub mod host;
pub mod metric;
pub mod rate_limit;
pub mod report;
pub mod stats;
