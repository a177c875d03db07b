//! 메트릭 저장소.
//!
//! 성능/API/캐시/에러 카테고리별 용량 제한 버퍼와 윈도우 집계 쿼리.
//! 추가는 실패하지 않고 검증하지 않는다. NaN 같은 값도 그대로 평균에 반영된다.

use beacon_core::config::MetricsConfig;
use beacon_core::models::metric::{
    ApiMetric, CacheMetric, CacheOperation, ErrorMetric, ErrorSeverity, PerformanceMetric,
};
use beacon_core::models::stats::{
    ApiStats, BufferSizes, CacheStats, EndpointStats, HealthStatus, PerformanceSummary,
    SeverityCounts, SystemHealth,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::buffer::BoundedBuffer;

/// 시스템 상태 판정 구간
const HEALTH_WINDOW: Duration = Duration::from_secs(3600);

/// 상태 판정 고정 규칙
const HEALTH_CRITICAL_RESPONSE_MS: f64 = 5000.0;
const HEALTH_WARNING_RESPONSE_MS: f64 = 2000.0;
const HEALTH_WARNING_ERROR_COUNT: u64 = 10;

/// `now - window` 계산. 범위를 벗어나면 가장 이른 시각
pub(crate) fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Default)]
struct EndpointAccumulator {
    count: u64,
    total_time: f64,
    errors: u64,
}

/// 카테고리별 용량 제한 메트릭 저장소
pub struct MetricStore {
    performance: RwLock<BoundedBuffer<PerformanceMetric>>,
    api: RwLock<BoundedBuffer<ApiMetric>>,
    cache: RwLock<BoundedBuffer<CacheMetric>>,
    errors: RwLock<BoundedBuffer<ErrorMetric>>,
}

impl MetricStore {
    /// 카테고리별 동일 용량으로 저장소 생성
    pub fn new(capacity: usize) -> Self {
        Self {
            performance: RwLock::new(BoundedBuffer::new(capacity)),
            api: RwLock::new(BoundedBuffer::new(capacity)),
            cache: RwLock::new(BoundedBuffer::new(capacity)),
            errors: RwLock::new(BoundedBuffer::new(capacity)),
        }
    }

    /// 설정의 버퍼 용량으로 저장소 생성
    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(config.buffer_capacity)
    }

    // ── 추가 ──

    pub fn append_performance(&self, metric: PerformanceMetric) {
        let dropped = self.performance.write().push(metric);
        if dropped > 0 {
            debug!("성능 버퍼 트리밍: {dropped}건 제거");
        }
    }

    pub fn append_api(&self, metric: ApiMetric) {
        let dropped = self.api.write().push(metric);
        if dropped > 0 {
            debug!("API 버퍼 트리밍: {dropped}건 제거");
        }
    }

    pub fn append_cache(&self, metric: CacheMetric) {
        let dropped = self.cache.write().push(metric);
        if dropped > 0 {
            debug!("캐시 버퍼 트리밍: {dropped}건 제거");
        }
    }

    pub fn append_error(&self, metric: ErrorMetric) {
        let dropped = self.errors.write().push(metric);
        if dropped > 0 {
            debug!("에러 버퍼 트리밍: {dropped}건 제거");
        }
    }

    // ── 집계 ──

    /// 최근 `window` 동안의 API 호출 집계
    pub fn get_api_stats(&self, window: Duration) -> ApiStats {
        self.get_api_stats_at(window, Utc::now())
    }

    pub fn get_api_stats_at(&self, window: Duration, now: DateTime<Utc>) -> ApiStats {
        let cutoff = window_start(now, window);
        let api = self.api.read();

        let mut total = 0u64;
        let mut total_time = 0.0;
        let mut errors = 0u64;
        let mut by_endpoint: BTreeMap<String, EndpointAccumulator> = BTreeMap::new();

        for m in api.iter().filter(|m| m.timestamp > cutoff) {
            total += 1;
            total_time += m.response_time_ms;
            let entry = by_endpoint.entry(m.endpoint_key()).or_default();
            entry.count += 1;
            entry.total_time += m.response_time_ms;
            if m.is_error() {
                errors += 1;
                entry.errors += 1;
            }
        }

        let endpoints = by_endpoint
            .into_iter()
            .map(|(key, acc)| {
                (
                    key,
                    EndpointStats {
                        count: acc.count,
                        avg_response_time: mean(acc.total_time, acc.count),
                        error_rate: percent(acc.errors, acc.count),
                    },
                )
            })
            .collect();

        ApiStats {
            total_requests: total,
            avg_response_time: mean(total_time, total),
            error_rate: percent(errors, total),
            endpoints,
        }
    }

    /// 최근 `window` 동안의 캐시 작업 집계
    pub fn get_cache_stats(&self, window: Duration) -> CacheStats {
        self.get_cache_stats_at(window, Utc::now())
    }

    pub fn get_cache_stats_at(&self, window: Duration, now: DateTime<Utc>) -> CacheStats {
        let cutoff = window_start(now, window);
        let cache = self.cache.read();

        let mut stats = CacheStats::default();
        for m in cache.iter().filter(|m| m.timestamp > cutoff) {
            stats.total += 1;
            *stats.by_operation.entry(m.operation).or_insert(0) += 1;
            match m.operation {
                CacheOperation::Hit => stats.hits += 1,
                CacheOperation::Miss => stats.misses += 1,
                CacheOperation::Set | CacheOperation::Delete => {}
            }
        }
        stats.hit_rate = percent(stats.hits, stats.lookups());
        stats
    }

    /// 최근 1시간 기준 시스템 상태
    pub fn get_system_health(&self) -> SystemHealth {
        self.get_system_health_at(Utc::now())
    }

    pub fn get_system_health_at(&self, now: DateTime<Utc>) -> SystemHealth {
        let cutoff = window_start(now, HEALTH_WINDOW);
        let (recent_errors, critical_errors) = {
            let errors = self.errors.read();
            errors
                .iter()
                .filter(|e| e.timestamp > cutoff)
                .fold((0u64, 0u64), |(all, critical), e| {
                    let is_critical = e.severity == ErrorSeverity::Critical;
                    (all + 1, critical + u64::from(is_critical))
                })
        };
        let api = self.get_api_stats_at(HEALTH_WINDOW, now);

        let status = if critical_errors > 0 || api.avg_response_time > HEALTH_CRITICAL_RESPONSE_MS
        {
            HealthStatus::Critical
        } else if recent_errors > HEALTH_WARNING_ERROR_COUNT
            || api.avg_response_time > HEALTH_WARNING_RESPONSE_MS
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        SystemHealth {
            status,
            recent_errors,
            critical_errors,
            avg_response_time: api.avg_response_time,
            total_requests: api.total_requests,
            error_rate: api.error_rate,
            timestamp: now,
        }
    }

    /// 이름별 성능 샘플 요약 (이름 오름차순)
    pub fn get_performance_summary(&self, window: Duration) -> Vec<PerformanceSummary> {
        self.get_performance_summary_at(window, Utc::now())
    }

    pub fn get_performance_summary_at(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Vec<PerformanceSummary> {
        let cutoff = window_start(now, window);
        let perf = self.performance.read();

        let mut by_name: BTreeMap<&str, (PerformanceSummary, f64)> = BTreeMap::new();
        for m in perf.iter().filter(|m| m.timestamp > cutoff) {
            let (summary, sum) = by_name.entry(m.name.as_str()).or_insert_with(|| {
                (
                    PerformanceSummary {
                        name: m.name.clone(),
                        unit: m.unit.clone(),
                        count: 0,
                        avg: 0.0,
                        min: f64::INFINITY,
                        max: f64::NEG_INFINITY,
                        last: m.value,
                    },
                    0.0,
                )
            });
            summary.count += 1;
            *sum += m.value;
            summary.min = summary.min.min(m.value);
            summary.max = summary.max.max(m.value);
            summary.last = m.value;
        }

        by_name
            .into_values()
            .map(|(mut summary, sum)| {
                summary.avg = mean(sum, summary.count);
                summary
            })
            .collect()
    }

    /// 최근 `window` 동안 심각도별 에러 수
    pub fn error_counts_by_severity(&self, window: Duration) -> SeverityCounts {
        self.error_counts_by_severity_at(window, Utc::now())
    }

    pub fn error_counts_by_severity_at(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> SeverityCounts {
        let cutoff = window_start(now, window);
        let mut counts = SeverityCounts::new();
        for e in self.errors.read().iter().filter(|e| e.timestamp > cutoff) {
            *counts.entry(e.severity).or_insert(0) += 1;
        }
        counts
    }

    // ── 원본 조회 ──

    /// 최근 성능 샘플 (최신순, 최대 `limit`건)
    pub fn recent_performance(&self, limit: usize) -> Vec<PerformanceMetric> {
        self.performance
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// 최근 에러 (최신순, 최대 `limit`건)
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorMetric> {
        self.errors.read().iter().rev().take(limit).cloned().collect()
    }

    /// 기준 시각 이후 에러 (최신순, 최대 `limit`건)
    pub fn errors_since(&self, since: DateTime<Utc>, limit: usize) -> Vec<ErrorMetric> {
        self.errors
            .read()
            .iter()
            .rev()
            .filter(|e| e.timestamp > since)
            .take(limit)
            .cloned()
            .collect()
    }

    /// 기준 시각 이후 성능 샘플 (최신순, 최대 `limit`건)
    pub fn performance_since(&self, since: DateTime<Utc>, limit: usize) -> Vec<PerformanceMetric> {
        self.performance
            .read()
            .iter()
            .rev()
            .filter(|m| m.timestamp > since)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn buffer_sizes(&self) -> BufferSizes {
        BufferSizes {
            performance: self.performance.read().len(),
            api: self.api.read().len(),
            cache: self.cache.read().len(),
            errors: self.errors.read().len(),
        }
    }

    /// 모든 버퍼 비우기
    pub fn clear(&self) {
        self.performance.write().clear();
        self.api.write().clear();
        self.cache.write().clear();
        self.errors.write().clear();
        debug!("메트릭 버퍼 초기화");
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}
