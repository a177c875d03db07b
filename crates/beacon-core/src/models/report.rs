//! 예약 리포트 모델.
//!
//! 반복 작업 정의, 실행 이력, 렌더러에 넘기는 데이터 스냅샷.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::alert::Alert;
use crate::models::metric::{ErrorMetric, PerformanceMetric};
use crate::models::stats::{ApiStats, CacheStats, PerformanceSummary, SeverityCounts, SystemHealth};

/// 반복 주기
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// 주기별 데이터 수집 구간 (1/7/30일)
    pub fn lookback(&self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
        }
    }
}

/// 실행 스케줄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub frequency: Frequency,
    /// 실행 시각 "HH:mm"
    pub time: String,
    /// 0=일요일 … 6=토요일 (weekly 필수)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u32>,
    /// 1 … 31 (monthly 필수, 짧은 달은 말일로 보정)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
}

impl Schedule {
    pub fn daily(time: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Daily,
            time: time.into(),
            day_of_week: None,
            day_of_month: None,
        }
    }

    pub fn weekly(day_of_week: u32, time: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            time: time.into(),
            day_of_week: Some(day_of_week),
            day_of_month: None,
        }
    }

    pub fn monthly(day_of_month: u32, time: impl Into<String>) -> Self {
        Self {
            frequency: Frequency::Monthly,
            time: time.into(),
            day_of_week: None,
            day_of_month: Some(day_of_month),
        }
    }

    /// "HH:mm" 파싱
    pub fn time_of_day(&self) -> Result<NaiveTime, CoreError> {
        let invalid = || CoreError::validation("schedule.time", format!("HH:mm 형식 아님: {}", self.time));
        let (h, m) = self.time.split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || m.len() != 2 || h.len() > 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
    }

    /// 주기별 필수 필드와 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        self.time_of_day()?;
        match self.frequency {
            Frequency::Daily => {}
            Frequency::Weekly => match self.day_of_week {
                Some(d) if d <= 6 => {}
                Some(d) => {
                    return Err(CoreError::validation(
                        "schedule.dayOfWeek",
                        format!("0-6 범위 아님: {d}"),
                    ))
                }
                None => {
                    return Err(CoreError::validation(
                        "schedule.dayOfWeek",
                        "weekly 스케줄에 요일이 없습니다",
                    ))
                }
            },
            Frequency::Monthly => match self.day_of_month {
                Some(d) if (1..=31).contains(&d) => {}
                Some(d) => {
                    return Err(CoreError::validation(
                        "schedule.dayOfMonth",
                        format!("1-31 범위 아님: {d}"),
                    ))
                }
                None => {
                    return Err(CoreError::validation(
                        "schedule.dayOfMonth",
                        "monthly 스케줄에 날짜가 없습니다",
                    ))
                }
            },
        }
        Ok(())
    }
}

/// 리포트 파일 형식 (렌더러가 해석)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Excel,
    Csv,
    Json,
}

/// 리포트 구성 섹션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportSection {
    ApiPerformance,
    CachePerformance,
    Errors,
    Alerts,
    SystemHealth,
    PerformanceSamples,
}

/// 렌더러에 그대로 전달되는 리포트 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    pub title: String,
    pub format: ReportFormat,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub include_charts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Performance Report".to_string(),
            format: ReportFormat::Pdf,
            sections: vec![
                ReportSection::ApiPerformance,
                ReportSection::CachePerformance,
                ReportSection::Errors,
                ReportSection::Alerts,
                ReportSection::SystemHealth,
            ],
            include_charts: true,
        }
    }
}

/// 예약 리포트 작업 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReport {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub config: ReportConfig,
    pub schedule: Schedule,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// 파생 값. 생성/수정/실행/기동 시 재계산
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// 새 예약 리포트 입력
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduledReport {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ReportConfig,
    pub schedule: Schedule,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub created_by: String,
}

fn default_enabled() -> bool {
    true
}

/// 예약 리포트 부분 수정 입력 (None 필드는 유지)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReportPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<ReportConfig>,
    pub schedule: Option<Schedule>,
    pub recipients: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

/// 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// 예약 리포트 실행 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReportRun {
    pub id: String,
    pub report_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// 렌더러에 전달되는 수집 데이터 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub report_id: String,
    pub report_name: String,
    pub generated_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub api_stats: ApiStats,
    pub cache_stats: CacheStats,
    pub system_health: SystemHealth,
    pub performance_summary: Vec<PerformanceSummary>,
    pub recent_performance: Vec<PerformanceMetric>,
    pub recent_errors: Vec<ErrorMetric>,
    pub errors_by_severity: SeverityCounts,
    pub active_alerts: Vec<Alert>,
    pub resolved_alerts: Vec<Alert>,
}

/// 렌더러 출력
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub file_path: String,
    /// 렌더러가 크기를 모르면 None (실행기가 추정)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}
