//! 알림 관리자.
//!
//! 주기적으로 메트릭 저장소와 호스트 메모리를 임계값과 비교해 알림을 열고,
//! 값이 회복되면 자동 해결한다. `(metric, type)`마다 미해결 알림은 하나뿐이다.
//!
//! 모든 변경(추가, 갱신, 해결, 확인) 후 잠금을 해제한 상태에서 구독자에게
//! 최신순 전체 목록을 등록 순서대로 전달한다.

use beacon_core::config::{AlertConfig, ThresholdConfig};
use beacon_core::error::CoreError;
use beacon_core::models::alert::{Alert, AlertBreach, AlertType};
use beacon_core::ports::monitor::HostMonitor;
use beacon_metrics::store::MetricStore;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::thresholds::{evaluate_breaches, LiveValues};

/// 구독 콜백. 최신순 전체 알림 목록을 받는다
pub type AlertCallback = Arc<dyn Fn(&[Alert]) -> Result<(), CoreError> + Send + Sync>;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: u64,
    entries: Vec<(u64, AlertCallback)>,
}

/// 구독 핸들. `unsubscribe()`로 해지
#[must_use = "핸들을 버려도 구독은 유지된다. 해지하려면 unsubscribe()를 호출"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<SubscriberRegistry>>,
}

impl Subscription {
    /// 구독 해지. 이미 해지됐거나 관리자가 사라졌으면 false
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|(id, _)| *id != self.id);
        registry.entries.len() != before
    }
}

/// 알림 관리자
pub struct AlertManager {
    config: AlertConfig,
    thresholds: RwLock<ThresholdConfig>,
    metrics: Arc<MetricStore>,
    host: Option<Arc<dyn HostMonitor>>,
    /// 생성 시각 최신순
    alerts: Mutex<Vec<Alert>>,
    subscribers: Arc<Mutex<SubscriberRegistry>>,
}

impl AlertManager {
    /// 새 알림 관리자 생성
    pub fn new(config: AlertConfig, metrics: Arc<MetricStore>) -> Self {
        Self {
            thresholds: RwLock::new(config.thresholds.clone()),
            config,
            metrics,
            host: None,
            alerts: Mutex::new(Vec::new()),
            subscribers: Arc::new(Mutex::new(SubscriberRegistry::default())),
        }
    }

    /// 메모리 사용률 평가용 호스트 모니터 연결
    pub fn with_host_monitor(mut self, host: Arc<dyn HostMonitor>) -> Self {
        self.host = Some(host);
        self
    }

    /// 임계값 테이블 교체 (다음 평가부터 적용)
    pub fn set_thresholds(&self, thresholds: ThresholdConfig) {
        *self.thresholds.write() = thresholds;
        info!("알림 임계값 업데이트됨");
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds.read().clone()
    }

    // ── 구독 ──

    /// 알림 변경 구독
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[Alert]) -> Result<(), CoreError> + Send + Sync + 'static,
    {
        let mut registry = self.subscribers.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, Arc::new(callback)));
        debug!("알림 구독 등록: id={id}");
        Subscription {
            id,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().entries.len()
    }

    /// 구독자별로 격리해 전달. 호출 시점에 잠금을 잡고 있으면 안 된다
    fn notify(&self) {
        let snapshot = self.alerts.lock().clone();
        let callbacks: Vec<(u64, AlertCallback)> = self.subscribers.lock().entries.clone();

        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&snapshot))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("알림 구독자 실패: id={id}: {e}"),
                Err(_) => error!("알림 구독자 패닉: id={id}"),
            }
        }
    }

    // ── 평가 ──

    /// 현재 측정값으로 임계값 평가 + 자동 해결. 발생한 위반 목록 반환
    pub async fn evaluate(&self) -> Vec<AlertBreach> {
        self.evaluate_at(Utc::now()).await
    }

    pub async fn evaluate_at(&self, now: DateTime<Utc>) -> Vec<AlertBreach> {
        let window = self.config.evaluation_window();
        let api = self.metrics.get_api_stats_at(window, now);
        let cache = self.metrics.get_cache_stats_at(window, now);
        let memory = self.memory_percent().await;

        let live = LiveValues::from_stats(&api, &cache, memory);
        let breaches = evaluate_breaches(&self.thresholds.read(), &live);

        for breach in &breaches {
            self.add_alert_at(breach.clone(), now);
        }
        self.auto_resolve_at(&live, now);

        debug!(
            "임계값 평가 완료: 요청 {}건, 위반 {}건",
            api.total_requests,
            breaches.len()
        );
        breaches
    }

    async fn memory_percent(&self) -> Option<f64> {
        let host = self.host.as_ref()?;
        match host.memory_usage().await {
            Ok(usage) => usage.percent(),
            Err(e) => {
                debug!("메모리 사용량 조회 불가, 검사 건너뜀: {e}");
                None
            }
        }
    }

    /// 위반 기록. 같은 `(metric, type)` 미해결 알림이 있으면 값/시각만 갱신
    pub fn add_alert(&self, breach: AlertBreach) -> Alert {
        self.add_alert_at(breach, Utc::now())
    }

    pub fn add_alert_at(&self, breach: AlertBreach, now: DateTime<Utc>) -> Alert {
        let (alert, created) = {
            let mut alerts = self.alerts.lock();
            let open = alerts
                .iter()
                .position(|a| a.is_open() && a.matches(breach.metric, breach.alert_type));
            if let Some(index) = open {
                let existing = &mut alerts[index];
                existing.value = breach.value;
                existing.message = breach.message;
                existing.timestamp = now;
                (existing.clone(), false)
            } else {
                let alert = Alert::from_breach(breach, now);
                alerts.insert(0, alert.clone());
                (alert, true)
            }
        };

        if created {
            match alert.alert_type {
                AlertType::Critical => error!(
                    target: "beacon::critical",
                    "심각 알림: {} - {} (id={})",
                    alert.title,
                    alert.message,
                    alert.id
                ),
                AlertType::Warning => info!("경고 알림: {} - {}", alert.title, alert.message),
            }
        } else {
            debug!("알림 갱신: {} value={}", alert.metric, alert.value);
        }

        self.notify();
        alert
    }

    /// 미해결 알림을 자신의 임계값 기준으로 재검사해 회복된 것 해결. 해결 건수 반환
    pub fn auto_resolve_at(&self, live: &LiveValues, now: DateTime<Utc>) -> usize {
        let resolved = {
            let mut alerts = self.alerts.lock();
            let mut resolved = 0;
            for alert in alerts.iter_mut().filter(|a| a.is_open()) {
                // 측정값이 없으면 판단하지 않음
                let Some(value) = live.get(alert.metric) else {
                    continue;
                };
                if alert.metric.is_cleared(value, alert.threshold) {
                    alert.resolved_at = Some(now);
                    resolved += 1;
                    info!("알림 자동 해결: {} (현재 {value:.1})", alert.title);
                }
            }
            resolved
        };

        if resolved > 0 {
            self.notify();
        }
        resolved
    }

    // ── 운영자 조작 ──

    /// 알림 확인 표시
    pub fn acknowledge(&self, id: &str) -> Result<Alert, CoreError> {
        let alert = {
            let mut alerts = self.alerts.lock();
            let alert = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| CoreError::not_found("Alert", id))?;
            alert.acknowledged = true;
            alert.clone()
        };
        debug!("알림 확인: {id}");
        self.notify();
        Ok(alert)
    }

    /// 알림 강제 해결. 이미 해결된 알림은 기존 해결 시각 유지
    pub fn resolve(&self, id: &str) -> Result<Alert, CoreError> {
        self.resolve_at(id, Utc::now())
    }

    pub fn resolve_at(&self, id: &str, now: DateTime<Utc>) -> Result<Alert, CoreError> {
        let (alert, changed) = {
            let mut alerts = self.alerts.lock();
            let alert = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| CoreError::not_found("Alert", id))?;
            let changed = alert.is_open();
            if changed {
                alert.resolved_at = Some(now);
            }
            (alert.clone(), changed)
        };
        if changed {
            info!("알림 수동 해결: {}", alert.title);
            self.notify();
        }
        Ok(alert)
    }

    /// 최근 해결된 알림만 보관 한도까지 남기고 제거. 미해결 알림은 유지
    pub fn cleanup(&self) -> usize {
        let max = self.config.max_resolved_alerts;
        let mut alerts = self.alerts.lock();

        let mut resolved: Vec<(DateTime<Utc>, String)> = alerts
            .iter()
            .filter_map(|a| a.resolved_at.map(|t| (t, a.id.clone())))
            .collect();
        if resolved.len() <= max {
            return 0;
        }

        // 해결 시각 최신순으로 한도 이후는 제거 대상
        resolved.sort_by(|a, b| b.0.cmp(&a.0));
        let evicted: HashSet<String> = resolved.into_iter().skip(max).map(|(_, id)| id).collect();

        alerts.retain(|a| !evicted.contains(&a.id));
        debug!("해결 알림 정리: {}건 제거", evicted.len());
        evicted.len()
    }

    // ── 조회 ──

    /// 전체 알림 (최신순)
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.is_open())
            .cloned()
            .collect()
    }

    pub fn resolved_alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|a| !a.is_open())
            .cloned()
            .collect()
    }

    /// 기준 시각 이후 해결된 알림
    pub fn resolved_since(&self, since: DateTime<Utc>) -> Vec<Alert> {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.resolved_at.is_some_and(|t| t > since))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Alert> {
        self.alerts.lock().iter().find(|a| a.id == id).cloned()
    }

    // ── 루프 ──

    /// 종료 신호까지 평가/정리 주기 실행
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "알림 관리자 시작: 평가={}s, 정리={}s, 구간={}s",
            self.config.evaluation_interval_secs,
            self.config.cleanup_interval_secs,
            self.config.evaluation_window_secs,
        );

        let mut evaluation = tokio::time::interval(self.config.evaluation_interval());
        let mut cleanup = tokio::time::interval(self.config.cleanup_interval());
        // 첫 tick은 즉시 발생
        evaluation.tick().await;
        cleanup.tick().await;

        loop {
            tokio::select! {
                _ = evaluation.tick() => {
                    self.evaluate().await;
                }
                _ = cleanup.tick() => {
                    self.cleanup();
                }
                _ = shutdown_rx.changed() => {
                    info!("알림 관리자 종료");
                    break;
                }
            }
        }
    }
}
