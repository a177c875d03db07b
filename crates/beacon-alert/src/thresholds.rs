//! 임계값 평가.
//!
//! 현재 측정값을 고정 임계값 테이블과 비교해 위반 기술자를 만든다.
//! 값이 없는 메트릭(트래픽 없음, 호스트 조회 불가)은 평가하지 않는다.

use beacon_core::config::ThresholdConfig;
use beacon_core::models::alert::{AlertBreach, AlertMetric, AlertType};
use beacon_core::models::stats::{ApiStats, CacheStats};

/// 평가 시점의 측정값. 측정 불가한 항목은 None
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveValues {
    /// 평균 응답 시간 (ms)
    pub response_time: Option<f64>,
    /// API 에러율 (%)
    pub error_rate: Option<f64>,
    /// 호스트 메모리 사용률 (%)
    pub memory_usage: Option<f64>,
    /// 캐시 적중률 (%)
    pub cache_hit_rate: Option<f64>,
}

impl LiveValues {
    /// 윈도우 집계와 메모리 사용률로 측정값 구성
    pub fn from_stats(api: &ApiStats, cache: &CacheStats, memory_usage: Option<f64>) -> Self {
        let has_traffic = api.total_requests > 0;
        Self {
            response_time: has_traffic.then_some(api.avg_response_time),
            error_rate: has_traffic.then_some(api.error_rate),
            memory_usage,
            cache_hit_rate: (cache.lookups() > 0).then_some(cache.hit_rate),
        }
    }

    pub fn get(&self, metric: AlertMetric) -> Option<f64> {
        match metric {
            AlertMetric::ResponseTime => self.response_time,
            AlertMetric::ErrorRate => self.error_rate,
            AlertMetric::MemoryUsage => self.memory_usage,
            AlertMetric::CacheHitRate => self.cache_hit_rate,
        }
    }
}

/// 메트릭별 (경고, 심각) 임계값
fn levels(thresholds: &ThresholdConfig, metric: AlertMetric) -> (f64, f64) {
    match metric {
        AlertMetric::ResponseTime => (
            thresholds.response_time_warning_ms,
            thresholds.response_time_critical_ms,
        ),
        AlertMetric::ErrorRate => (thresholds.error_rate_warning, thresholds.error_rate_critical),
        AlertMetric::MemoryUsage => (thresholds.memory_warning, thresholds.memory_critical),
        AlertMetric::CacheHitRate => (
            thresholds.cache_hit_rate_warning,
            thresholds.cache_hit_rate_critical,
        ),
    }
}

fn crosses(metric: AlertMetric, value: f64, threshold: f64) -> bool {
    if metric.breaches_below() {
        value < threshold
    } else {
        value > threshold
    }
}

fn describe(metric: AlertMetric, alert_type: AlertType, value: f64, threshold: f64) -> (String, String) {
    let level = match alert_type {
        AlertType::Warning => "경고",
        AlertType::Critical => "심각",
    };
    match metric {
        AlertMetric::ResponseTime => (
            format!("응답 시간 {level}"),
            format!("평균 응답 시간 {value:.0}ms (임계값 {threshold:.0}ms)"),
        ),
        AlertMetric::ErrorRate => (
            format!("에러율 {level}"),
            format!("API 에러율 {value:.1}% (임계값 {threshold:.1}%)"),
        ),
        AlertMetric::MemoryUsage => (
            format!("메모리 사용률 {level}"),
            format!("메모리 사용률 {value:.1}% (임계값 {threshold:.1}%)"),
        ),
        AlertMetric::CacheHitRate => (
            format!("캐시 적중률 {level}"),
            format!("캐시 적중률 {value:.1}% (임계값 {threshold:.1}% 미만)"),
        ),
    }
}

const ALL_METRICS: [AlertMetric; 4] = [
    AlertMetric::ResponseTime,
    AlertMetric::ErrorRate,
    AlertMetric::MemoryUsage,
    AlertMetric::CacheHitRate,
];

/// 측정값을 임계값 테이블과 비교. 메트릭당 가장 높은 단계 하나만 반환
pub fn evaluate_breaches(thresholds: &ThresholdConfig, live: &LiveValues) -> Vec<AlertBreach> {
    ALL_METRICS
        .into_iter()
        .filter_map(|metric| {
            let value = live.get(metric)?;
            let (warning, critical) = levels(thresholds, metric);
            let (alert_type, threshold) = if crosses(metric, value, critical) {
                (AlertType::Critical, critical)
            } else if crosses(metric, value, warning) {
                (AlertType::Warning, warning)
            } else {
                return None;
            };
            let (title, message) = describe(metric, alert_type, value, threshold);
            Some(AlertBreach {
                alert_type,
                metric,
                value,
                threshold,
                title,
                message,
            })
        })
        .collect()
}
