//! 기본 리포트 렌더러.
//!
//! 설정과 데이터 스냅샷을 보기 좋은 JSON 파일로 기록한다.
//! 구조: `<output_dir>/<report_id>/<YYYYMMDD-HHMMSS>.json`

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::report::{RenderedReport, ReportConfig, ReportData};
use beacon_core::ports::renderer::ReportRenderer;
use serde_json::json;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// JSON 스냅샷 렌더러: `ReportRenderer` 포트 구현
pub struct JsonSnapshotRenderer {
    output_dir: PathBuf,
}

impl JsonSnapshotRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

#[async_trait]
impl ReportRenderer for JsonSnapshotRenderer {
    async fn render(
        &self,
        config: &ReportConfig,
        data: &ReportData,
    ) -> Result<RenderedReport, CoreError> {
        let dir = self.output_dir.join(&data.report_id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::Render(format!("리포트 폴더 생성 실패: {e}")))?;

        let file_name = format!("{}.json", data.generated_at.format("%Y%m%d-%H%M%S"));
        let file_path = dir.join(file_name);

        let body = serde_json::to_vec_pretty(&json!({
            "config": config,
            "data": data,
        }))?;
        fs::write(&file_path, &body)
            .await
            .map_err(|e| CoreError::Render(format!("리포트 파일 저장 실패: {e}")))?;

        debug!("리포트 파일 저장: {} ({}bytes)", file_path.display(), body.len());

        Ok(RenderedReport {
            file_path: file_path.to_string_lossy().to_string(),
            file_size: Some(body.len() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::stats::{ApiStats, CacheStats, HealthStatus, SystemHealth};
    use chrono::Utc;
    use tempfile::TempDir;

    fn data() -> ReportData {
        let now = Utc::now();
        ReportData {
            report_id: "weekly-1".to_string(),
            report_name: "주간 리포트".to_string(),
            generated_at: now,
            period_start: now - chrono::Duration::days(7),
            period_end: now,
            api_stats: ApiStats::default(),
            cache_stats: CacheStats::default(),
            system_health: SystemHealth {
                status: HealthStatus::Healthy,
                recent_errors: 0,
                critical_errors: 0,
                avg_response_time: 0.0,
                total_requests: 0,
                error_rate: 0.0,
                timestamp: now,
            },
            performance_summary: vec![],
            recent_performance: vec![],
            recent_errors: vec![],
            errors_by_severity: Default::default(),
            active_alerts: vec![],
            resolved_alerts: vec![],
        }
    }

    #[tokio::test]
    async fn writes_snapshot_file() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = JsonSnapshotRenderer::new(temp_dir.path());

        let rendered = renderer.render(&ReportConfig::default(), &data()).await.unwrap();
        let content = std::fs::read(&rendered.file_path).unwrap();
        assert_eq!(rendered.file_size, Some(content.len() as u64));

        let value: serde_json::Value = serde_json::from_slice(&content).unwrap();
        assert_eq!(value["data"]["reportName"], "주간 리포트");
        assert_eq!(value["config"]["format"], "pdf");
        assert!(rendered.file_path.contains("weekly-1"));
    }
}
