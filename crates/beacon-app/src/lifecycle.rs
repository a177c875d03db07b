//! 엔진 종료 제어.
//!
//! 백그라운드 루프는 모두 같은 `watch<bool>` 수신기를 구독하고,
//! OS 시그널을 받으면 한 번에 종료된다.

use std::fmt;
use tokio::sync::watch;
use tracing::info;

/// 종료를 일으킨 시그널
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// 종료 신호 송신측. 루프마다 `subscribe()`로 수신기를 나눠 준다
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { shutdown_tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// 모든 루프에 종료 전파. 두 번째 호출부터는 무시
    pub fn shutdown(&self) {
        let first = self.shutdown_tx.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if first {
            info!("엔진 종료 신호 전파");
        }
    }

    /// SIGINT/SIGTERM(비 unix는 Ctrl+C) 대기 후 종료 전파
    pub async fn wait_for_signal(&self) -> std::io::Result<ShutdownSignal> {
        let signal = Self::next_signal().await?;
        info!("{signal} 수신");
        self.shutdown();
        Ok(signal)
    }

    #[cfg(unix)]
    async fn next_signal() -> std::io::Result<ShutdownSignal> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        Ok(tokio::select! {
            _ = sigint.recv() => ShutdownSignal::Interrupt,
            _ = sigterm.recv() => ShutdownSignal::Terminate,
        })
    }

    #[cfg(not(unix))]
    async fn next_signal() -> std::io::Result<ShutdownSignal> {
        tokio::signal::ctrl_c().await?;
        Ok(ShutdownSignal::Interrupt)
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}
