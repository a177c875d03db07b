//! 엔진 전체 흐름 통합 테스트

use assert_matches::assert_matches;
use async_trait::async_trait;
use beacon_alert::AlertManager;
use beacon_core::config::{AlertConfig, RateLimitConfig, ReportSchedulerConfig};
use beacon_core::error::CoreError;
use beacon_core::models::alert::{AlertMetric, AlertType};
use beacon_core::models::metric::{ApiMetric, ErrorSeverity};
use beacon_core::models::report::{
    NewScheduledReport, RenderedReport, ReportConfig, ReportData, RunStatus, Schedule,
};
use beacon_core::ports::renderer::ReportRenderer;
use beacon_core::ports::storage::ReportStore;
use beacon_metrics::rate_limit::RateLimitMonitor;
use beacon_metrics::store::MetricStore;
use beacon_report::collector::ReportDataCollector;
use beacon_report::renderer::JsonSnapshotRenderer;
use beacon_report::ReportScheduler;
use beacon_storage::SqliteReportStore;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Engine {
    metrics: Arc<MetricStore>,
    alerts: Arc<AlertManager>,
    scheduler: Arc<ReportScheduler>,
}

fn engine(
    renderer: Arc<dyn ReportRenderer>,
    store: Option<Arc<dyn ReportStore>>,
) -> Engine {
    let metrics = Arc::new(MetricStore::new(1_000));
    let alerts = Arc::new(AlertManager::new(AlertConfig::default(), metrics.clone()));
    let collector = ReportDataCollector::new(metrics.clone(), alerts.clone(), 50);
    let scheduler = ReportScheduler::new(
        ReportSchedulerConfig::default(),
        collector,
        renderer,
        store,
    );
    Engine {
        metrics,
        alerts,
        scheduler,
    }
}

fn sqlite_store(dir: &Path) -> Arc<dyn ReportStore> {
    Arc::new(SqliteReportStore::open(&dir.join("beacon.db")).unwrap())
}

fn daily_report(name: &str) -> NewScheduledReport {
    NewScheduledReport {
        name: name.to_string(),
        description: String::new(),
        config: ReportConfig::default(),
        schedule: Schedule::daily("08:00"),
        recipients: vec!["ops@example.com".to_string()],
        enabled: true,
        created_by: "admin".to_string(),
    }
}

struct FailingRenderer;

#[async_trait]
impl ReportRenderer for FailingRenderer {
    async fn render(
        &self,
        _config: &ReportConfig,
        _data: &ReportData,
    ) -> Result<RenderedReport, CoreError> {
        Err(CoreError::Render("디스크 가득 참".to_string()))
    }
}

#[tokio::test]
async fn slow_and_failing_api_raises_alerts() {
    let temp = TempDir::new().unwrap();
    let e = engine(Arc::new(JsonSnapshotRenderer::new(temp.path())), None);

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    let subscription = e.alerts.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    for _ in 0..100 {
        e.metrics
            .append_api(ApiMetric::new("GET", "/api/leads", 200, 200.0));
    }
    for _ in 0..10 {
        e.metrics
            .append_api(ApiMetric::new("GET", "/api/leads", 500, 30_000.0));
    }

    // 평균 (100*200 + 10*30000)/110 ≈ 2909ms, 에러율 ≈ 9.09%
    let breaches = e.alerts.evaluate().await;
    assert_eq!(breaches.len(), 2);

    let active = e.alerts.active_alerts();
    assert_eq!(active.len(), 2);
    assert!(active
        .iter()
        .any(|a| a.matches(AlertMetric::ResponseTime, AlertType::Warning)));
    assert!(active
        .iter()
        .any(|a| a.matches(AlertMetric::ErrorRate, AlertType::Warning)));
    assert!(notified.load(Ordering::SeqCst) >= 2);

    // 같은 조건으로 재평가해도 중복 알림 없음
    e.alerts.evaluate().await;
    assert_eq!(e.alerts.active_alerts().len(), 2);

    assert!(subscription.unsubscribe());
}

#[tokio::test]
async fn rate_limit_violations_become_error_metrics() {
    let metrics = Arc::new(MetricStore::new(100));
    let config = RateLimitConfig {
        default_limit: 3,
        ..RateLimitConfig::default()
    };
    let monitor = RateLimitMonitor::from_config(&config).with_metric_store(metrics.clone());

    // 윈도우 경계에 걸리지 않도록 시각 고정
    let now = Utc::now();
    let decisions: Vec<_> = (0..5)
        .map(|_| monitor.check_rate_limit_at("10.0.0.1", "/api/login", config.default_limit, now))
        .collect();
    assert_eq!(decisions.iter().filter(|d| d.allowed).count(), 3);
    assert!(!decisions[4].allowed);
    assert_eq!(decisions[4].remaining, 0);

    let errors = metrics.recent_errors(10);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].severity, ErrorSeverity::Medium);
    assert_eq!(errors[0].endpoint.as_deref(), Some("/api/login"));
    assert_eq!(monitor.stats().total_violations, 2);

    // 다른 IP는 별도 카운터
    assert!(
        monitor
            .check_rate_limit_at("10.0.0.2", "/api/login", config.default_limit, now)
            .allowed
    );
}

#[tokio::test]
async fn run_now_writes_file_and_persists_run() {
    let temp = TempDir::new().unwrap();
    let store = sqlite_store(temp.path());
    let e = engine(
        Arc::new(JsonSnapshotRenderer::new(temp.path().join("reports"))),
        Some(store.clone()),
    );
    e.metrics
        .append_api(ApiMetric::new("POST", "/api/clients", 201, 42.0));

    let job = e.scheduler.add(daily_report("일간 성능")).await.unwrap();
    let run = e.scheduler.run_now(&job.id).await.unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let file_path = run.file_path.clone().unwrap();
    assert!(Path::new(&file_path).exists());
    assert!(run.file_size.unwrap() > 0);

    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file_path).unwrap()).unwrap();
    assert_eq!(body["data"]["reportName"], "일간 성능");
    assert_eq!(body["data"]["apiStats"]["totalRequests"], 1);

    let persisted = store.load_runs(Utc::now() - chrono::Duration::days(1)).await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status, RunStatus::Completed);

    let updated = e.scheduler.get(&job.id).unwrap();
    assert!(updated.last_run.is_some());
    assert!(updated.next_run.unwrap() > Utc::now());

    e.scheduler.shutdown();
}

#[tokio::test]
async fn restart_restores_jobs_and_history() {
    let temp = TempDir::new().unwrap();
    let store = sqlite_store(temp.path());
    let renderer: Arc<dyn ReportRenderer> =
        Arc::new(JsonSnapshotRenderer::new(temp.path().join("reports")));

    let first = engine(renderer.clone(), Some(store.clone()));
    let job = first.scheduler.add(daily_report("재시작")).await.unwrap();
    first.scheduler.run_now(&job.id).await.unwrap();
    first.scheduler.shutdown();

    let second = engine(renderer, Some(store));
    assert_eq!(second.scheduler.load().await.unwrap(), 1);

    let restored = second.scheduler.get(&job.id).unwrap();
    assert_eq!(restored.name, "재시작");
    assert!(restored.enabled);
    assert!(restored.next_run.unwrap() > Utc::now());
    assert_eq!(second.scheduler.get_runs(Some(&job.id)).len(), 1);
    assert_eq!(second.scheduler.pending_timers(), 1);

    second.scheduler.shutdown();
}

#[tokio::test]
async fn failed_run_is_recorded_without_alert() {
    let e = engine(Arc::new(FailingRenderer), None);
    let job = e.scheduler.add(daily_report("실패")).await.unwrap();

    let run = e.scheduler.run_now(&job.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_matches!(run.error.as_deref(), Some(msg) if msg.contains("디스크 가득 참"));
    assert!(run.end_time.is_some());

    assert!(e.alerts.alerts().is_empty());
    assert_eq!(e.scheduler.get_runs(None).len(), 1);

    let job = e.scheduler.get(&job.id).unwrap();
    assert!(job.enabled);
    assert!(job.next_run.unwrap() > Utc::now());

    e.scheduler.shutdown();
}

#[tokio::test]
async fn unknown_report_is_not_found() {
    let e = engine(Arc::new(FailingRenderer), None);
    let err = e.scheduler.run_now("missing").await.unwrap_err();
    assert_matches!(err, CoreError::NotFound { .. });
}
