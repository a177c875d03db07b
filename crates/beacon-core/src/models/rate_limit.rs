//! 요청 빈도 제한 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `ip:endpoint` 키별 고정 윈도우 카운터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitWindow {
    pub ip: String,
    pub endpoint: String,
    pub count: u32,
    /// 에포크 정렬된 윈도우 시작 시각
    pub window_start: DateTime<Utc>,
    pub limit: u32,
}

/// 빈도 제한 검사 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// 현재 윈도우가 끝나는 시각
    pub reset_time: DateTime<Utc>,
}

/// 빈도 제한 모니터 상태 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    /// 추적 중인 키 수
    pub tracked_keys: usize,
    /// 누적 거부 횟수
    pub total_violations: u64,
}
