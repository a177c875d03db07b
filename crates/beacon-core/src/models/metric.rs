//! 원시 메트릭 이벤트 모델.
//!
//! 성능 샘플, API 호출, 캐시 작업, 에러 이벤트. 생성 후 변경되지 않는다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 이름 기반 성능 샘플 (예: 페이지 로드 시간)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    /// 샘플 ID
    pub id: String,
    /// 메트릭 이름
    pub name: String,
    /// 측정값
    pub value: f64,
    /// 단위 (ms, bytes 등)
    pub unit: String,
    /// 측정 시각
    pub timestamp: DateTime<Utc>,
    /// 부가 태그
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl PerformanceMetric {
    /// 현재 시각 기준 새 샘플 생성
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            value,
            unit: unit.into(),
            timestamp: Utc::now(),
            tags: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// HTTP 핸들러 호출 1회 기록 (성공/실패 모두)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetric {
    /// 요청 경로
    pub endpoint: String,
    /// HTTP 메서드
    pub method: String,
    /// 응답 상태 코드
    pub status_code: u16,
    /// 응답 시간 (밀리초)
    pub response_time_ms: f64,
    /// 완료 시각
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ApiMetric {
    /// 현재 시각 기준 새 API 메트릭 생성
    pub fn new(
        method: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: u16,
        response_time_ms: f64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            status_code,
            response_time_ms,
            timestamp: Utc::now(),
            user_agent: None,
            ip: None,
            user_id: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 4xx/5xx 모두 에러로 집계
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    /// 엔드포인트별 집계 키 ("METHOD path")
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.endpoint)
    }
}

/// 캐시 작업 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOperation {
    Hit,
    Miss,
    Set,
    Delete,
}

/// 캐시 작업 1회 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetric {
    /// 캐시 키
    pub key: String,
    /// 작업 종류
    pub operation: CacheOperation,
    /// 작업 시각
    pub timestamp: DateTime<Utc>,
    /// TTL (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// 값 크기 (바이트)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl CacheMetric {
    pub fn new(key: impl Into<String>, operation: CacheOperation) -> Self {
        Self {
            key: key.into(),
            operation,
            timestamp: Utc::now(),
            ttl: None,
            size: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// 에러 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// 에러 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetric {
    /// 에러 메시지
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 심각도
    pub severity: ErrorSeverity,
}

impl ErrorMetric {
    pub fn new(error: impl Into<String>, severity: ErrorSeverity) -> Self {
        Self {
            error: error.into(),
            stack: None,
            endpoint: None,
            user_id: None,
            timestamp: Utc::now(),
            severity,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
