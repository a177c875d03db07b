//! 리포트 렌더링 포트.
//!
//! 파일 형식과 저장 위치는 렌더러가 결정한다.
//! 기본 구현: `beacon-report::renderer::JsonSnapshotRenderer`

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::report::{RenderedReport, ReportConfig, ReportData};

/// 리포트 파일 생성기
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// 설정과 데이터 스냅샷으로 리포트 파일 생성
    async fn render(
        &self,
        config: &ReportConfig,
        data: &ReportData,
    ) -> Result<RenderedReport, CoreError>;
}
