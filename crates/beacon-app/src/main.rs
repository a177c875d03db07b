//! # beacon-app
//!
//! Beacon 관측/알림 엔진 바이너리 진입점.
//! DI 컨테이너 역할, 라이프사이클 관리, 백그라운드 루프 오케스트레이션.

mod event_bus;
mod lifecycle;

use anyhow::{Context, Result};
use beacon_alert::AlertManager;
use beacon_core::config_manager::ConfigManager;
use beacon_core::ports::monitor::HostMonitor;
use beacon_core::ports::renderer::ReportRenderer;
use beacon_core::ports::storage::ReportStore;
use beacon_metrics::rate_limit::RateLimitMonitor;
use beacon_metrics::store::MetricStore;
use beacon_monitor::system::SysInfoMonitor;
use beacon_report::collector::ReportDataCollector;
use beacon_report::renderer::JsonSnapshotRenderer;
use beacon_report::ReportScheduler;
use beacon_storage::SqliteReportStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::event_bus::{AppEvent, EventBus};
use crate::lifecycle::LifecycleManager;

/// Beacon 관측/알림 엔진
///
/// 메트릭 수집, 임계값 알림, 요청 빈도 제한, 예약 리포트
#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리/config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (DB, 리포트 파일)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 적용될 설정을 출력하고 종료
    #[arg(long)]
    print_config: bool,
}

/// 데이터 디렉토리 결정 (CLI 인자 또는 플랫폼별 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/com.beacon.engine/`
/// - Windows: `%APPDATA%\beacon\engine\data\`
/// - Linux: `~/.local/share/engine/`
fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir
        .or_else(|| ConfigManager::data_dir().ok())
        .unwrap_or_else(|| PathBuf::from("./beacon-data"))
}

fn init_tracing(log_level: &str) {
    let log_filter = [
        "beacon",
        "beacon_app",
        "beacon_core",
        "beacon_metrics",
        "beacon_monitor",
        "beacon_alert",
        "beacon_report",
        "beacon_storage",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .collect::<Vec<_>>()
    .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}

/// 알림 요약 이벤트 로깅 (종료 신호까지)
async fn log_app_events(
    mut rx: broadcast::Receiver<AppEvent>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(AppEvent::AlertsChanged { total, active, critical_active }) => {
                    info!("알림 상태: 전체 {total}건, 활성 {active}건 (심각 {critical_active}건)");
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("이벤트 {n}건 누락");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown_rx.changed() => break,
        }
    }
    debug!("이벤트 로거 종료");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let data_dir = resolve_data_dir(args.data_dir.clone());

    // ── 설정 ──
    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone())
            .with_context(|| format!("설정 파일 로드 실패: {}", path.display()))?,
        None => match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                warn!("설정 관리자 초기화 실패, 데이터 디렉토리 사용: {e}");
                ConfigManager::with_path(data_dir.join("config.json"))
                    .context("설정 관리자 생성 실패")?
            }
        },
    };
    let config = config_manager.get();

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Beacon 엔진 시작");
    info!("설정 파일: {}", config_manager.config_path().display());
    info!("데이터 디렉토리: {}", data_dir.display());

    // ── 메트릭 + 빈도 제한 ──
    let metrics = Arc::new(MetricStore::from_config(&config.metrics));
    let rate_limiter = Arc::new(
        RateLimitMonitor::from_config(&config.rate_limit).with_metric_store(metrics.clone()),
    );

    // ── 알림 ──
    let host: Arc<dyn HostMonitor> = Arc::new(SysInfoMonitor::new());
    let alerts = Arc::new(
        AlertManager::new(config.alert.clone(), metrics.clone()).with_host_monitor(host),
    );

    let event_bus = Arc::new(EventBus::default());
    let bus = event_bus.clone();
    let alert_subscription = alerts.subscribe(move |list| {
        bus.publish(AppEvent::alerts_changed(list));
        Ok(())
    });

    // ── 저장소 (실패 시 메모리 전용) ──
    let db_path = config
        .storage
        .db_path
        .clone()
        .unwrap_or_else(|| data_dir.join("beacon.db"));
    let store: Option<Arc<dyn ReportStore>> = match SqliteReportStore::open(&db_path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("SQLite 저장소 열기 실패, 메모리 전용으로 실행: {e}");
            None
        }
    };

    // ── 예약 리포트 ──
    let output_dir = config
        .report
        .output_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("reports"));
    let renderer: Arc<dyn ReportRenderer> = Arc::new(JsonSnapshotRenderer::new(output_dir));
    let collector =
        ReportDataCollector::new(metrics.clone(), alerts.clone(), config.report.sample_limit);
    let scheduler = ReportScheduler::new(config.report.clone(), collector, renderer, store);
    match scheduler.load().await {
        Ok(count) => info!("예약 리포트 {count}건 복원"),
        Err(e) => warn!("예약 리포트 복원 실패: {e}"),
    }

    // ── 백그라운드 루프 ──
    let lifecycle = LifecycleManager::new();
    let tasks = vec![
        tokio::spawn(alerts.clone().run(lifecycle.subscribe())),
        tokio::spawn(
            rate_limiter
                .clone()
                .run_cleanup_loop(config.rate_limit.cleanup_interval(), lifecycle.subscribe()),
        ),
        tokio::spawn(scheduler.clone().run_maintenance_loop(lifecycle.subscribe())),
        tokio::spawn(log_app_events(event_bus.subscribe(), lifecycle.subscribe())),
    ];

    info!("Beacon 엔진 실행 중 (Ctrl+C로 종료)");
    lifecycle
        .wait_for_signal()
        .await
        .context("시그널 핸들러 등록 실패")?;

    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            warn!("백그라운드 태스크 비정상 종료: {e}");
        }
    }
    alert_subscription.unsubscribe();

    let stats = rate_limiter.stats();
    info!(
        "Beacon 엔진 종료 (빈도 제한 키 {}개, 누적 거부 {}건)",
        stats.tracked_keys, stats.total_violations
    );
    Ok(())
}
