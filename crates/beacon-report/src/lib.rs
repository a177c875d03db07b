//! # beacon-report
//!
//! 예약 리포트 실행기.
//!
//! - [`schedule`]: 다음 실행 시각 계산 (순수 함수)
//! - [`collector`]: 메트릭/알림 스냅샷 수집
//! - [`renderer`]: 기본 JSON 스냅샷 렌더러
//! - [`scheduler`]: 작업 CRUD, 타이머, 실행 이력

pub mod collector;
pub mod renderer;
pub mod schedule;
pub mod scheduler;

pub use scheduler::ReportScheduler;
