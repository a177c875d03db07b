//! 윈도우 집계 결과 모델.
//!
//! 메트릭 저장소가 호출 시점에 계산해 값으로 반환하는 읽기 전용 스냅샷.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::metric::{CacheOperation, ErrorSeverity};

/// 엔드포인트("METHOD path")별 집계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub count: u64,
    pub avg_response_time: f64,
    /// 에러율 (%)
    pub error_rate: f64,
}

/// API 호출 집계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    pub total_requests: u64,
    /// 평균 응답 시간 (ms, 요청 없으면 0)
    pub avg_response_time: f64,
    /// 상태 코드 >= 400 비율 (%)
    pub error_rate: f64,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

/// 캐시 작업 집계
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// 전체 작업 수 (set/delete 포함)
    pub total: u64,
    /// hits / (hits + misses) * 100, 작업 없으면 0
    pub hit_rate: f64,
    pub by_operation: BTreeMap<CacheOperation, u64>,
}

impl CacheStats {
    /// 적중률 계산에 쓰이는 조회 작업(hit + miss) 수
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// 시스템 상태 3단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// 최근 1시간 기준 시스템 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    /// 최근 1시간 에러 수
    pub recent_errors: u64,
    /// 최근 1시간 critical 에러 수
    pub critical_errors: u64,
    /// 최근 1시간 평균 응답 시간 (ms)
    pub avg_response_time: f64,
    /// 최근 1시간 요청 수
    pub total_requests: u64,
    /// 최근 1시간 API 에러율 (%)
    pub error_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// 이름별 성능 샘플 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub name: String,
    pub unit: String,
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// 가장 최근 값
    pub last: f64,
}

/// 심각도별 에러 수
pub type SeverityCounts = BTreeMap<ErrorSeverity, u64>;

/// 버퍼별 현재 보관 건수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSizes {
    pub performance: usize,
    pub api: usize,
    pub cache: usize,
    pub errors: usize,
}
