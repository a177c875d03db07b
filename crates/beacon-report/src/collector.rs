//! 리포트 데이터 수집.
//!
//! 작업 주기에 맞는 구간(1/7/30일)으로 메트릭 저장소와 알림 관리자에서 스냅샷을 만든다.

use beacon_alert::AlertManager;
use beacon_core::models::report::{ReportData, ScheduledReport};
use beacon_metrics::store::MetricStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// 리포트 스냅샷 수집기
pub struct ReportDataCollector {
    metrics: Arc<MetricStore>,
    alerts: Arc<AlertManager>,
    /// 최근 샘플/에러 최대 건수
    sample_limit: usize,
}

impl ReportDataCollector {
    pub fn new(metrics: Arc<MetricStore>, alerts: Arc<AlertManager>, sample_limit: usize) -> Self {
        Self {
            metrics,
            alerts,
            sample_limit,
        }
    }

    /// `now`까지의 주기 구간 스냅샷 생성
    pub fn collect(&self, report: &ScheduledReport, now: DateTime<Utc>) -> ReportData {
        let lookback = report.schedule.frequency.lookback();
        let window = lookback.to_std().unwrap_or(Duration::ZERO);
        let period_start = now - lookback;

        ReportData {
            report_id: report.id.clone(),
            report_name: report.name.clone(),
            generated_at: now,
            period_start,
            period_end: now,
            api_stats: self.metrics.get_api_stats_at(window, now),
            cache_stats: self.metrics.get_cache_stats_at(window, now),
            system_health: self.metrics.get_system_health_at(now),
            performance_summary: self.metrics.get_performance_summary_at(window, now),
            recent_performance: self.metrics.performance_since(period_start, self.sample_limit),
            recent_errors: self.metrics.errors_since(period_start, self.sample_limit),
            errors_by_severity: self.metrics.error_counts_by_severity_at(window, now),
            active_alerts: self.alerts.active_alerts(),
            resolved_alerts: self.alerts.resolved_since(period_start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::config::AlertConfig;
    use beacon_core::models::metric::{ApiMetric, ErrorMetric, ErrorSeverity};
    use beacon_core::models::report::{ReportConfig, Schedule};

    fn report(schedule: Schedule) -> ScheduledReport {
        ScheduledReport {
            id: "r1".to_string(),
            name: "일간 성능".to_string(),
            description: String::new(),
            config: ReportConfig::default(),
            schedule,
            recipients: vec![],
            enabled: true,
            last_run: None,
            next_run: None,
            created_at: Utc::now(),
            created_by: "admin".to_string(),
        }
    }

    #[test]
    fn collects_lookback_window() {
        let metrics = Arc::new(MetricStore::default());
        let alerts = Arc::new(AlertManager::new(AlertConfig::default(), metrics.clone()));
        let collector = ReportDataCollector::new(metrics.clone(), alerts, 10);
        let now = Utc::now();

        metrics.append_api(ApiMetric::new("GET", "/a", 200, 100.0).at(now - chrono::Duration::hours(2)));
        metrics.append_api(ApiMetric::new("GET", "/a", 200, 100.0).at(now - chrono::Duration::days(3)));
        metrics.append_error(ErrorMetric::new("boom", ErrorSeverity::High).at(now - chrono::Duration::hours(1)));

        let daily = collector.collect(&report(Schedule::daily("08:00")), now);
        assert_eq!(daily.api_stats.total_requests, 1);
        assert_eq!(daily.period_start, now - chrono::Duration::days(1));
        assert_eq!(daily.recent_errors.len(), 1);
        assert_eq!(daily.errors_by_severity[&ErrorSeverity::High], 1);

        let weekly = collector.collect(&report(Schedule::weekly(1, "08:00")), now);
        assert_eq!(weekly.api_stats.total_requests, 2);
        assert_eq!(weekly.report_name, "일간 성능");
    }
}
