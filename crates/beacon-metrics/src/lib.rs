//! # beacon-metrics
//!
//! 인메모리 메트릭 저장소와 고정 윈도우 요청 빈도 제한.
//!
//! - [`store::MetricStore`]: 카테고리별 용량 제한 버퍼 + 윈도우 집계
//! - [`rate_limit::RateLimitMonitor`]: `ip:endpoint` 단위 요청 빈도 제한

pub mod buffer;
pub mod rate_limit;
pub mod store;
