//! 호스트 메모리 모니터링.
//!
//! `HostMonitor` 포트 구현. sysinfo 기반 메모리 사용량 수집.

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::host::MemoryUsage;
use beacon_core::ports::monitor::HostMonitor;
use std::sync::Mutex;
use sysinfo::System;
use tracing::debug;

/// sysinfo 기반 호스트 모니터: `HostMonitor` 포트 구현
pub struct SysInfoMonitor {
    sys: Mutex<System>,
}

impl SysInfoMonitor {
    /// 새 호스트 모니터 생성
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl Default for SysInfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostMonitor for SysInfoMonitor {
    async fn memory_usage(&self) -> Result<MemoryUsage, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_memory();

        let usage = MemoryUsage {
            used: sys.used_memory(),
            total: sys.total_memory(),
            timestamp: chrono::Utc::now(),
        };

        // 컨테이너/샌드박스에서 전체 메모리를 못 읽는 경우
        if usage.total == 0 {
            return Err(CoreError::HostUnavailable(
                "전체 메모리 정보를 읽을 수 없습니다".to_string(),
            ));
        }

        debug!(
            "메모리 사용량: {}/{}MB",
            usage.used / 1_048_576,
            usage.total / 1_048_576
        );

        Ok(usage)
    }
}
