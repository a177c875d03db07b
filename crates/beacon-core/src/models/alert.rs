//! 알림 모델.
//!
//! `(metric, type)` 쌍마다 미해결 알림은 최대 1개.
//! 해결된 알림은 변경되지 않는 이력이다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 알림 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Critical,
}

/// 알림 대상 메트릭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    /// 평균 응답 시간 (ms)
    ResponseTime,
    /// API 에러율 (%)
    ErrorRate,
    /// 호스트 메모리 사용률 (%)
    MemoryUsage,
    /// 캐시 적중률 (%)
    CacheHitRate,
}

impl AlertMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseTime => "response_time",
            Self::ErrorRate => "error_rate",
            Self::MemoryUsage => "memory_usage",
            Self::CacheHitRate => "cache_hit_rate",
        }
    }

    /// 값이 임계값보다 낮을 때 위반인 메트릭인지
    pub fn breaches_below(&self) -> bool {
        matches!(self, Self::CacheHitRate)
    }

    /// 현재 값이 알림 임계값 기준으로 정상 범위인지
    pub fn is_cleared(&self, value: f64, threshold: f64) -> bool {
        if self.breaches_below() {
            value >= threshold
        } else {
            value <= threshold
        }
    }
}

impl fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 임계값 위반 기술자 (알림 후보)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertBreach {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub metric: AlertMetric,
    pub value: f64,
    pub threshold: f64,
    pub title: String,
    pub message: String,
}

/// 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub metric: AlertMetric,
    /// 최근 위반 값
    pub value: f64,
    pub threshold: f64,
    /// 생성 또는 최근 갱신 시각
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// 위반 기술자로부터 새 미해결 알림 생성
    pub fn from_breach(breach: AlertBreach, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_type: breach.alert_type,
            title: breach.title,
            message: breach.message,
            metric: breach.metric,
            value: breach.value,
            threshold: breach.threshold,
            timestamp: now,
            acknowledged: false,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }

    pub fn matches(&self, metric: AlertMetric, alert_type: AlertType) -> bool {
        self.metric == metric && self.alert_type == alert_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breach() -> AlertBreach {
        AlertBreach {
            alert_type: AlertType::Warning,
            metric: AlertMetric::ResponseTime,
            value: 2500.0,
            threshold: 2000.0,
            title: "응답 지연".to_string(),
            message: "평균 응답 시간 2500ms".to_string(),
        }
    }

    #[test]
    fn from_breach_is_open_and_unacknowledged() {
        let alert = Alert::from_breach(breach(), Utc::now());
        assert!(alert.is_open());
        assert!(!alert.acknowledged);
        assert!(alert.matches(AlertMetric::ResponseTime, AlertType::Warning));
        assert!(!alert.matches(AlertMetric::ResponseTime, AlertType::Critical));
    }

    #[test]
    fn cleared_direction_depends_on_metric() {
        assert!(AlertMetric::ResponseTime.is_cleared(2000.0, 2000.0));
        assert!(!AlertMetric::ResponseTime.is_cleared(2000.1, 2000.0));
        assert!(AlertMetric::CacheHitRate.is_cleared(70.0, 70.0));
        assert!(!AlertMetric::CacheHitRate.is_cleared(69.9, 70.0));
    }

    #[test]
    fn alert_wire_format() {
        let alert = Alert::from_breach(breach(), Utc::now());
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["metric"], "response_time");
        assert!(json.get("resolvedAt").is_none());
    }
}
