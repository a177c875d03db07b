//! Beacon 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 라이브러리 에러를 `CoreError`로 변환해 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 저장소, 렌더링 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Alert", "ScheduledReport")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 저장소 에러 (SQLite 등)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 리포트 렌더링 실패
    #[error("리포트 렌더링 실패: {0}")]
    Render(String),

    /// 호스트 리소스 조회 불가
    #[error("호스트 정보 조회 불가: {0}")]
    HostUnavailable(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// `Validation` 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// `NotFound` 에러 생성 헬퍼
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}
