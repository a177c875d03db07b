//! 고정 윈도우 요청 빈도 제한.
//!
//! `ip:endpoint` 키마다 에포크 정렬 윈도우 카운터를 유지한다.
//! 윈도우 경계를 넘나들면 최대 `2 × limit`까지 허용될 수 있다.

use beacon_core::config::RateLimitConfig;
use beacon_core::models::metric::{ErrorMetric, ErrorSeverity};
use beacon_core::models::rate_limit::{RateLimitDecision, RateLimitStats, RateLimitWindow};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::store::MetricStore;

fn window_key(ip: &str, endpoint: &str) -> String {
    format!("{ip}:{endpoint}")
}

/// 빈도 제한 모니터
pub struct RateLimitMonitor {
    windows: Mutex<HashMap<String, RateLimitWindow>>,
    window: Duration,
    default_limit: u32,
    violations: AtomicU64,
    /// 거부 시 에러 메트릭을 기록할 저장소
    metrics: Option<Arc<MetricStore>>,
}

impl RateLimitMonitor {
    /// 새 모니터 생성 (윈도우는 최소 1ms)
    pub fn new(window: Duration, default_limit: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window: window.max(Duration::from_millis(1)),
            default_limit,
            violations: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.default_limit)
    }

    /// 거부 이벤트를 메트릭 저장소에 기록하도록 연결
    pub fn with_metric_store(mut self, metrics: Arc<MetricStore>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// `now`가 속한 에포크 정렬 윈도우의 시작 시각
    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let w = self.window_ms();
        let start_ms = now.timestamp_millis().div_euclid(w) * w;
        DateTime::from_timestamp_millis(start_ms).unwrap_or(now)
    }

    fn window_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + chrono::Duration::milliseconds(self.window_ms())
    }

    /// 요청 1건을 기록하고 허용 여부 판정
    pub fn check_rate_limit(&self, ip: &str, endpoint: &str, limit: u32) -> RateLimitDecision {
        self.check_rate_limit_at(ip, endpoint, limit, Utc::now())
    }

    /// 설정의 기본 한도로 검사
    pub fn check_default(&self, ip: &str, endpoint: &str) -> RateLimitDecision {
        self.check_rate_limit(ip, endpoint, self.default_limit)
    }

    pub fn check_rate_limit_at(
        &self,
        ip: &str,
        endpoint: &str,
        limit: u32,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let start = self.window_start(now);
        let count = {
            let mut windows = self.windows.lock();
            let entry = windows
                .entry(window_key(ip, endpoint))
                .or_insert_with(|| RateLimitWindow {
                    ip: ip.to_string(),
                    endpoint: endpoint.to_string(),
                    count: 0,
                    window_start: start,
                    limit,
                });
            if entry.window_start != start {
                entry.window_start = start;
                entry.count = 0;
            }
            entry.limit = limit;
            entry.count = entry.count.saturating_add(1);
            entry.count
        };

        let allowed = count <= limit;
        if !allowed {
            self.violations.fetch_add(1, Ordering::Relaxed);
            debug!("빈도 제한 초과: {ip} {endpoint} ({count}/{limit})");
            if let Some(metrics) = &self.metrics {
                metrics.append_error(
                    ErrorMetric::new(
                        format!("Rate limit exceeded for {ip} on {endpoint}"),
                        ErrorSeverity::Medium,
                    )
                    .with_endpoint(endpoint)
                    .at(now),
                );
            }
        }

        RateLimitDecision {
            allowed,
            remaining: limit.saturating_sub(count),
            reset_time: self.window_end(start),
        }
    }

    /// 윈도우 시작이 2 윈도우 길이보다 오래된 항목 제거. 제거 건수 반환
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - chrono::Duration::milliseconds(self.window_ms().saturating_mul(2));
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, w| w.window_start >= cutoff);
        before - windows.len()
    }

    /// 키 하나의 카운터 제거
    pub fn reset(&self, ip: &str, endpoint: &str) -> bool {
        self.windows.lock().remove(&window_key(ip, endpoint)).is_some()
    }

    /// 특정 키의 현재 윈도우 상태
    pub fn window(&self, ip: &str, endpoint: &str) -> Option<RateLimitWindow> {
        self.windows.lock().get(&window_key(ip, endpoint)).cloned()
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            tracked_keys: self.windows.lock().len(),
            total_violations: self.violations.load(Ordering::Relaxed),
        }
    }

    /// 종료 신호까지 주기적 정리
    pub async fn run_cleanup_loop(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("빈도 제한 정리 루프 시작: {}s 주기", interval.as_secs());
        let mut ticker = tokio::time::interval(interval);
        // 첫 tick은 즉시 발생
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.cleanup();
                    if removed > 0 {
                        debug!("만료된 빈도 제한 윈도우 {removed}건 정리");
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() {
                        warn!("종료 채널 닫힘");
                    }
                    info!("빈도 제한 정리 루프 종료");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn monitor() -> RateLimitMonitor {
        RateLimitMonitor::new(Duration::from_secs(60), 100)
    }

    #[test]
    fn sixth_request_is_denied_then_next_window_resets() {
        let monitor = monitor();
        // 윈도우 [1_700_000_040, 1_700_000_100)
        let base = 1_700_000_040;

        for i in 1..=5 {
            let decision = monitor.check_rate_limit_at("1.2.3.4", "/api/leads", 5, at(base + i));
            assert!(decision.allowed);
            assert_eq!(decision.remaining, 5 - i as u32);
        }
        let denied = monitor.check_rate_limit_at("1.2.3.4", "/api/leads", 5, at(base + 10));
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_time, at(base + 60));

        let next = monitor.check_rate_limit_at("1.2.3.4", "/api/leads", 5, at(base + 61));
        assert!(next.allowed);
        assert_eq!(next.remaining, 4);
        assert_eq!(monitor.window("1.2.3.4", "/api/leads").unwrap().count, 1);
    }

    #[test]
    fn windows_are_epoch_aligned() {
        let monitor = monitor();
        let decision = monitor.check_rate_limit_at("ip", "/x", 10, at(1_700_000_059));
        let window = monitor.window("ip", "/x").unwrap();
        assert_eq!(window.window_start, at(1_700_000_040));
        assert_eq!(decision.reset_time, at(1_700_000_100));
    }

    #[test]
    fn keys_are_independent() {
        let monitor = monitor();
        let t = at(1_700_000_040);
        assert!(monitor.check_rate_limit_at("a", "/x", 1, t).allowed);
        assert!(!monitor.check_rate_limit_at("a", "/x", 1, t).allowed);
        assert!(monitor.check_rate_limit_at("b", "/x", 1, t).allowed);
        assert!(monitor.check_rate_limit_at("a", "/y", 1, t).allowed);
    }

    #[test]
    fn denial_records_medium_error() {
        let store = Arc::new(MetricStore::default());
        let monitor = monitor().with_metric_store(store.clone());
        let t = at(1_700_000_040);

        monitor.check_rate_limit_at("9.9.9.9", "/login", 1, t);
        assert_eq!(store.buffer_sizes().errors, 0);

        monitor.check_rate_limit_at("9.9.9.9", "/login", 1, t);
        let errors = store.recent_errors(10);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, ErrorSeverity::Medium);
        assert_eq!(errors[0].endpoint.as_deref(), Some("/login"));
        assert!(errors[0].error.contains("9.9.9.9"));
        assert_eq!(monitor.stats().total_violations, 1);
    }

    #[test]
    fn cleanup_removes_windows_older_than_two_lengths() {
        let monitor = monitor();
        monitor.check_rate_limit_at("old", "/x", 5, at(1_700_000_040));
        monitor.check_rate_limit_at("recent", "/x", 5, at(1_700_000_100));

        // cutoff = 1_700_000_160 - 120 = 1_700_000_040, 같은 시각은 유지
        assert_eq!(monitor.cleanup_at(at(1_700_000_160)), 0);
        assert_eq!(monitor.cleanup_at(at(1_700_000_161)), 1);
        assert!(monitor.window("old", "/x").is_none());
        assert!(monitor.window("recent", "/x").is_some());
        assert_eq!(monitor.stats().tracked_keys, 1);
    }

    #[test]
    fn reset_drops_key() {
        let monitor = monitor();
        monitor.check_default("ip", "/x");
        assert!(monitor.reset("ip", "/x"));
        assert!(!monitor.reset("ip", "/x"));
        assert_eq!(monitor.stats().tracked_keys, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_loop_stops_on_shutdown() {
        let monitor = Arc::new(monitor());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.clone().run_cleanup_loop(Duration::from_secs(300), rx));

        tokio::time::sleep(Duration::from_secs(301)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
