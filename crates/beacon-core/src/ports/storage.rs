//! 예약 리포트 저장소 포트.
//!
//! 구현: `beacon-storage` crate (SQLite)
//!
//! 저장 실패는 호출자가 로그로 남기고, 메모리 상태를 계속 기준으로 사용한다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::report::{ScheduledReport, ScheduledReportRun};

/// 예약 리포트 정의 + 실행 이력 저장소
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// 저장된 작업 정의 전체 로드
    async fn load_reports(&self) -> Result<Vec<ScheduledReport>, CoreError>;

    /// 작업 정의 저장 (upsert)
    async fn save_report(&self, report: &ScheduledReport) -> Result<(), CoreError>;

    /// 작업 정의 삭제
    async fn delete_report(&self, id: &str) -> Result<(), CoreError>;

    /// 실행 기록 저장 (upsert)
    async fn save_run(&self, run: &ScheduledReportRun) -> Result<(), CoreError>;

    /// 기준 시각 이후 시작된 실행 기록 로드 (시작 시각 오름차순)
    async fn load_runs(&self, since: DateTime<Utc>) -> Result<Vec<ScheduledReportRun>, CoreError>;

    /// 기준 시각 이전 실행 기록 삭제, 삭제 건수 반환
    async fn prune_runs(&self, before: DateTime<Utc>) -> Result<usize, CoreError>;
}
