//! 내부 이벤트 버스.
//!
//! `tokio::broadcast` 기반 내부 이벤트 라우팅. 알림 관리자의 동기 구독 콜백을
//! 비동기 소비자와 분리한다.

use beacon_core::models::alert::{Alert, AlertType};
use tokio::sync::broadcast;
use tracing::debug;

/// 내부 앱 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// 알림 목록 변경
    AlertsChanged {
        total: usize,
        active: usize,
        critical_active: usize,
    },
}

impl AppEvent {
    /// 최신순 알림 목록에서 요약 이벤트 생성
    pub fn alerts_changed(alerts: &[Alert]) -> Self {
        let active = alerts.iter().filter(|a| a.is_open());
        let (active, critical_active) = active.fold((0, 0), |(all, critical), a| {
            (all + 1, critical + usize::from(a.alert_type == AlertType::Critical))
        });
        Self::AlertsChanged {
            total: alerts.len(),
            active,
            critical_active,
        }
    }
}

/// 내부 이벤트 버스
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행 (구독자 없으면 버림)
    pub fn publish(&self, event: AppEvent) {
        debug!("이벤트 발행: {event:?}");
        let _ = self.tx.send(event);
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
