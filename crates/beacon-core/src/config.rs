//! 애플리케이션 설정 구조체.
//!
//! 메트릭 버퍼 용량, 알림 평가 주기와 임계값 테이블, 빈도 제한 윈도우,
//! 예약 리포트 보존 정책, 저장소 경로 등 런타임 설정을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 메트릭 저장소 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 알림 관리자 설정
    #[serde(default)]
    pub alert: AlertConfig,
    /// 빈도 제한 설정
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// 예약 리포트 설정
    #[serde(default)]
    pub report: ReportSchedulerConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

// ============================================================
// 메트릭 저장소 설정
// ============================================================

/// 메트릭 버퍼 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 카테고리별 버퍼 최대 건수. 초과 시 최근 절반만 유지
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    10_000
}

// ============================================================
// 알림 설정
// ============================================================

/// 고정 임계값 테이블
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// 평균 응답 시간 경고 (ms)
    pub response_time_warning_ms: f64,
    /// 평균 응답 시간 심각 (ms)
    pub response_time_critical_ms: f64,
    /// 에러율 경고 (%)
    pub error_rate_warning: f64,
    /// 에러율 심각 (%)
    pub error_rate_critical: f64,
    /// 메모리 사용률 경고 (%)
    pub memory_warning: f64,
    /// 메모리 사용률 심각 (%)
    pub memory_critical: f64,
    /// 캐시 적중률 경고 (% 미만)
    pub cache_hit_rate_warning: f64,
    /// 캐시 적중률 심각 (% 미만)
    pub cache_hit_rate_critical: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            response_time_warning_ms: 2000.0,
            response_time_critical_ms: 5000.0,
            error_rate_warning: 5.0,
            error_rate_critical: 10.0,
            memory_warning: 80.0,
            memory_critical: 90.0,
            cache_hit_rate_warning: 70.0,
            cache_hit_rate_critical: 50.0,
        }
    }
}

/// 알림 관리자 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// 임계값 평가 주기 (초)
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,
    /// 평가 시 집계 구간 (초)
    #[serde(default = "default_evaluation_window_secs")]
    pub evaluation_window_secs: u64,
    /// 해결 알림 정리 주기 (초)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// 보관할 해결 알림 최대 수
    #[serde(default = "default_max_resolved_alerts")]
    pub max_resolved_alerts: usize,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: default_evaluation_interval_secs(),
            evaluation_window_secs: default_evaluation_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_resolved_alerts: default_max_resolved_alerts(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl AlertConfig {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs)
    }

    pub fn evaluation_window(&self) -> Duration {
        Duration::from_secs(self.evaluation_window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_evaluation_interval_secs() -> u64 {
    60
}

fn default_evaluation_window_secs() -> u64 {
    300 // 5분
}

fn default_cleanup_interval_secs() -> u64 {
    3600 // 1시간
}

fn default_max_resolved_alerts() -> usize {
    100
}

// ============================================================
// 빈도 제한 설정
// ============================================================

/// 빈도 제한 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// 고정 윈도우 크기 (초, 에포크 정렬)
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
    /// 오래된 윈도우 정리 주기 (초)
    #[serde(default = "default_rate_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// 호출자가 한도를 지정하지 않을 때 사용하는 기본 한도
    #[serde(default = "default_rate_limit")]
    pub default_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_rate_window_secs(),
            cleanup_interval_secs: default_rate_cleanup_interval_secs(),
            default_limit: default_rate_limit(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_rate_cleanup_interval_secs() -> u64 {
    300
}

fn default_rate_limit() -> u32 {
    100
}

// ============================================================
// 예약 리포트 설정
// ============================================================

/// 스케줄 시각 해석 기준
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleTimezone {
    /// 호스트 로컬 시간대
    #[default]
    Local,
    Utc,
}

/// 예약 리포트 실행기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSchedulerConfig {
    /// 실행 이력 보존 기간 (일)
    #[serde(default = "default_run_retention_days")]
    pub run_retention_days: u32,
    /// 이력 정리 주기 (초)
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// 기본 렌더러 출력 디렉토리 (None이면 데이터 디렉토리/reports)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// 리포트에 포함할 최근 샘플/에러 최대 건수
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    #[serde(default)]
    pub timezone: ScheduleTimezone,
}

impl Default for ReportSchedulerConfig {
    fn default() -> Self {
        Self {
            run_retention_days: default_run_retention_days(),
            prune_interval_secs: default_prune_interval_secs(),
            output_dir: None,
            sample_limit: default_sample_limit(),
            timezone: ScheduleTimezone::Local,
        }
    }
}

impl ReportSchedulerConfig {
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    pub fn run_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.run_retention_days))
    }
}

fn default_run_retention_days() -> u32 {
    30
}

fn default_prune_interval_secs() -> u64 {
    86_400 // 1일
}

fn default_sample_limit() -> usize {
    100
}

// ============================================================
// 저장소 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite 파일 경로 (None이면 데이터 디렉토리/beacon.db)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 주기/용량/임계값 일관성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.metrics.buffer_capacity < 2 {
            return Err(CoreError::validation(
                "metrics.buffer_capacity",
                "2 이상이어야 합니다",
            ));
        }
        for (field, value) in [
            ("alert.evaluation_interval_secs", self.alert.evaluation_interval_secs),
            ("alert.evaluation_window_secs", self.alert.evaluation_window_secs),
            ("alert.cleanup_interval_secs", self.alert.cleanup_interval_secs),
            ("rate_limit.window_secs", self.rate_limit.window_secs),
            ("rate_limit.cleanup_interval_secs", self.rate_limit.cleanup_interval_secs),
            ("report.prune_interval_secs", self.report.prune_interval_secs),
        ] {
            if value == 0 {
                return Err(CoreError::validation(field, "0보다 커야 합니다"));
            }
        }

        let t = &self.alert.thresholds;
        if t.response_time_warning_ms > t.response_time_critical_ms {
            return Err(CoreError::validation(
                "alert.thresholds.response_time",
                "경고 임계값이 심각 임계값보다 큽니다",
            ));
        }
        if t.error_rate_warning > t.error_rate_critical {
            return Err(CoreError::validation(
                "alert.thresholds.error_rate",
                "경고 임계값이 심각 임계값보다 큽니다",
            ));
        }
        if t.memory_warning > t.memory_critical {
            return Err(CoreError::validation(
                "alert.thresholds.memory",
                "경고 임계값이 심각 임계값보다 큽니다",
            ));
        }
        // 적중률은 낮을수록 나쁘므로 방향이 반대
        if t.cache_hit_rate_warning < t.cache_hit_rate_critical {
            return Err(CoreError::validation(
                "alert.thresholds.cache_hit_rate",
                "경고 임계값이 심각 임계값보다 작습니다",
            ));
        }
        Ok(())
    }
}
