//! Ctrl-C handling
//!
//! The first interrupt sets a flag the session checks between stages and
//! wakes the input prompt; a second one exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Exit status used when a second interrupt forces termination
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    set: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.set.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }

    /// Resolve once the flag is set
    pub async fn wait(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Spawn the signal listener feeding `flag`
pub fn listen_for_ctrl_c(flag: InterruptFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Interrupt received, finishing current step");
        flag.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let flag = InterruptFlag::new();
        let waiter = flag.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        flag.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait should finish")
            .unwrap();
        assert!(flag.is_set());
    }

    #[tokio::test]
    async fn test_wait_on_already_set_flag() {
        let flag = InterruptFlag::new();
        flag.trigger();
        tokio::time::timeout(Duration::from_millis(100), flag.wait())
            .await
            .expect("already set");
    }
}
