//! 설정 파일 로드와 어댑터 와이어링 테스트

use beacon_alert::AlertManager;
use beacon_core::config::ScheduleTimezone;
use beacon_core::config_manager::ConfigManager;
use beacon_core::ports::monitor::HostMonitor;
use beacon_core::ports::storage::ReportStore;
use beacon_metrics::rate_limit::RateLimitMonitor;
use beacon_metrics::store::MetricStore;
use beacon_monitor::system::SysInfoMonitor;
use beacon_storage::SqliteReportStore;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn default_config_file_is_created_and_valid() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());

    let config = manager.get();
    assert!(config.validate().is_ok());
    assert_eq!(config.metrics.buffer_capacity, 10_000);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.report.timezone, ScheduleTimezone::Local);
    assert!(config.storage.db_path.is_none());
}

#[test]
fn partial_config_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"rate_limit":{"default_limit":5}}"#).unwrap();

    let config = ConfigManager::with_path(path).unwrap().get();
    assert_eq!(config.rate_limit.default_limit, 5);
    assert_eq!(config.rate_limit.window_secs, 60);
    assert_eq!(config.alert.evaluation_interval_secs, 60);
}

#[tokio::test]
async fn adapters_wire_from_config() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigManager::with_path(temp.path().join("config.json")).unwrap();
    let config = manager.get();

    let metrics = Arc::new(MetricStore::from_config(&config.metrics));
    let rate_limiter =
        RateLimitMonitor::from_config(&config.rate_limit).with_metric_store(metrics.clone());
    assert!(rate_limiter.check_default("127.0.0.1", "/health").allowed);

    let host: Arc<dyn HostMonitor> = Arc::new(SysInfoMonitor::new());
    let alerts = AlertManager::new(config.alert.clone(), metrics).with_host_monitor(host);
    alerts.evaluate().await;
    // 트래픽이 없으면 API/캐시 알림 없음 (메모리는 호스트 상태에 따라 다름)
    assert!(alerts
        .alerts()
        .iter()
        .all(|a| a.metric == beacon_core::models::alert::AlertMetric::MemoryUsage));
}

#[test]
fn sqlite_store_opens_under_configured_path() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("nested").join("beacon.db");

    let store: Arc<dyn ReportStore> = Arc::new(SqliteReportStore::open(&db_path).unwrap());
    assert!(db_path.exists());

    let reports = tokio_test::block_on(store.load_reports()).unwrap();
    assert!(reports.is_empty());
}
