//! 예약 리포트 저장 (ReportStore 포트 구현).
//!
//! 정의와 실행 기록은 JSON 본문으로 저장하고, 조회/정리에 쓰는 컬럼만 따로 둔다.

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::report::{RunStatus, ScheduledReport, ScheduledReportRun};
use beacon_core::ports::storage::ReportStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::SqliteReportStore;

fn status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
    }
}

impl SqliteReportStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn load_reports(&self) -> Result<Vec<ScheduledReport>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, data FROM scheduled_reports ORDER BY rowid")
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| CoreError::Storage(format!("쿼리 실행 실패: {e}")))?;

        let mut reports = Vec::new();
        for row in rows {
            let (id, data) = row.map_err(|e| CoreError::Storage(format!("행 읽기 실패: {e}")))?;
            match serde_json::from_str::<ScheduledReport>(&data) {
                Ok(report) => reports.push(report),
                Err(e) => warn!("손상된 예약 리포트 건너뜀: {id}: {e}"),
            }
        }

        debug!("예약 리포트 로드: {}건", reports.len());
        Ok(reports)
    }

    async fn save_report(&self, report: &ScheduledReport) -> Result<(), CoreError> {
        let data = serde_json::to_string(report)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO scheduled_reports (id, name, enabled, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                enabled = excluded.enabled,
                data = excluded.data,
                updated_at = excluded.updated_at",
            rusqlite::params![report.id, report.name, report.enabled, data],
        )
        .map_err(|e| CoreError::Storage(format!("예약 리포트 저장 실패: {e}")))?;

        debug!("예약 리포트 저장: {}", report.id);
        Ok(())
    }

    async fn delete_report(&self, id: &str) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM scheduled_reports WHERE id = ?1", [id])
            .map_err(|e| CoreError::Storage(format!("예약 리포트 삭제 실패: {e}")))?;
        Ok(())
    }

    async fn save_run(&self, run: &ScheduledReportRun) -> Result<(), CoreError> {
        let data = serde_json::to_string(run)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO report_runs (id, report_id, status, start_time_ms, data)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                data = excluded.data",
            rusqlite::params![
                run.id,
                run.report_id,
                status_str(run.status),
                run.start_time.timestamp_millis(),
                data
            ],
        )
        .map_err(|e| CoreError::Storage(format!("실행 기록 저장 실패: {e}")))?;

        Ok(())
    }

    async fn load_runs(&self, since: DateTime<Utc>) -> Result<Vec<ScheduledReportRun>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, data FROM report_runs WHERE start_time_ms >= ?1 ORDER BY start_time_ms ASC",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let rows = stmt
            .query_map([since.timestamp_millis()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CoreError::Storage(format!("쿼리 실행 실패: {e}")))?;

        let mut runs = Vec::new();
        for row in rows {
            let (id, data) = row.map_err(|e| CoreError::Storage(format!("행 읽기 실패: {e}")))?;
            match serde_json::from_str::<ScheduledReportRun>(&data) {
                Ok(run) => runs.push(run),
                Err(e) => warn!("손상된 실행 기록 건너뜀: {id}: {e}"),
            }
        }

        debug!("실행 기록 로드: {}건", runs.len());
        Ok(runs)
    }

    async fn prune_runs(&self, before: DateTime<Utc>) -> Result<usize, CoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM report_runs WHERE start_time_ms < ?1",
                [before.timestamp_millis()],
            )
            .map_err(|e| CoreError::Storage(format!("실행 기록 정리 실패: {e}")))?;

        if deleted > 0 {
            info!("보존 기간 경과 실행 기록 삭제: {deleted}건");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::report::{ReportConfig, Schedule};
    use chrono::Duration;
    use tempfile::TempDir;

    fn report(name: &str) -> ScheduledReport {
        ScheduledReport {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: "설명".to_string(),
            config: ReportConfig::default(),
            schedule: Schedule::weekly(1, "08:00"),
            recipients: vec!["ops@example.com".to_string()],
            enabled: true,
            last_run: None,
            next_run: Some(Utc::now() + Duration::days(1)),
            created_at: Utc::now(),
            created_by: "admin".to_string(),
        }
    }

    fn run(report_id: &str, start: DateTime<Utc>, status: RunStatus) -> ScheduledReportRun {
        ScheduledReportRun {
            id: uuid::Uuid::new_v4().to_string(),
            report_id: report_id.to_string(),
            start_time: start,
            end_time: None,
            status,
            error: None,
            file_path: None,
            file_size: None,
        }
    }

    #[tokio::test]
    async fn save_load_and_delete_reports() {
        let store = SqliteReportStore::open_in_memory().unwrap();
        let a = report("A");
        let b = report("B");
        store.save_report(&a).await.unwrap();
        store.save_report(&b).await.unwrap();

        let loaded = store.load_reports().await.unwrap();
        assert_eq!(loaded, vec![a.clone(), b.clone()]);

        store.delete_report(&a.id).await.unwrap();
        let loaded = store.load_reports().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, b.id);
    }

    #[tokio::test]
    async fn save_report_upserts() {
        let store = SqliteReportStore::open_in_memory().unwrap();
        let mut a = report("A");
        store.save_report(&a).await.unwrap();

        a.enabled = false;
        a.name = "A2".to_string();
        store.save_report(&a).await.unwrap();

        let loaded = store.load_reports().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "A2");
        assert!(!loaded[0].enabled);
    }

    #[tokio::test]
    async fn runs_upsert_load_and_prune() {
        let store = SqliteReportStore::open_in_memory().unwrap();
        let now = Utc::now();

        let mut recent = run("r1", now - Duration::hours(1), RunStatus::Running);
        let old = run("r1", now - Duration::days(40), RunStatus::Failed);
        store.save_run(&recent).await.unwrap();
        store.save_run(&old).await.unwrap();

        recent.status = RunStatus::Completed;
        recent.end_time = Some(now);
        store.save_run(&recent).await.unwrap();

        let all = store.load_runs(now - Duration::days(365)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, old.id);
        assert_eq!(all[1].status, RunStatus::Completed);

        let deleted = store.prune_runs(now - Duration::days(30)).await.unwrap();
        assert_eq!(deleted, 1);
        let remaining = store.load_runs(now - Duration::days(365)).await.unwrap();
        assert_eq!(remaining, vec![recent]);
    }

    #[tokio::test]
    async fn corrupt_run_row_is_skipped() {
        let store = SqliteReportStore::open_in_memory().unwrap();
        let now = Utc::now();
        let good = run("r1", now - Duration::hours(2), RunStatus::Completed);
        store.save_run(&good).await.unwrap();

        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO report_runs (id, report_id, status, start_time_ms, data)
                 VALUES ('broken', 'r1', 'completed', ?1, '{not json')",
                [(now - Duration::hours(1)).timestamp_millis()],
            )
            .unwrap();

        let runs = store.load_runs(now - Duration::days(1)).await.unwrap();
        assert_eq!(runs, vec![good]);
    }

    #[tokio::test]
    async fn file_store_persists_across_open() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("beacon.db");
        let a = report("A");

        {
            let store = SqliteReportStore::open(&path).unwrap();
            store.save_report(&a).await.unwrap();
        }

        let store = SqliteReportStore::open(&path).unwrap();
        assert_eq!(store.load_reports().await.unwrap(), vec![a]);
    }
}
