//! # beacon-alert
//!
//! 임계값 기반 알림 수명주기 관리.
//!
//! - [`thresholds`]: 측정값과 임계값 테이블 비교
//! - [`manager::AlertManager`]: 중복 제거, 자동 해결, 운영자 조작, 구독자 알림

pub mod manager;
pub mod thresholds;

pub use manager::{AlertCallback, AlertManager, Subscription};
