//! 호스트 리소스 조회 포트.
//!
//! 구현: `beacon-monitor` crate (sysinfo)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::host::MemoryUsage;

/// 호스트 메모리 사용량 조회
///
/// 조회가 불가능한 환경이면 `Err`를 반환하고, 호출자는 해당 검사를 건너뛴다.
#[async_trait]
pub trait HostMonitor: Send + Sync {
    /// 현재 메모리 사용량 조회
    async fn memory_usage(&self) -> Result<MemoryUsage, CoreError>;
}
