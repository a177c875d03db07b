//! 호스트 리소스 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 메모리 사용량 스냅샷
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// 사용 중 메모리 (바이트)
    pub used: u64,
    /// 전체 메모리 (바이트)
    pub total: u64,
    pub timestamp: DateTime<Utc>,
}

impl MemoryUsage {
    /// 사용률 (0.0 ~ 100.0). 전체가 0이면 None
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.used as f64 / self.total as f64 * 100.0)
    }
}
