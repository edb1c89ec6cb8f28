//! View lifetimes.
//!
//! A [`ViewScope`] lives as long as the view that owns it. Fetches run through
//! the scope; once the view is torn down, results that arrive later are
//! dropped instead of being applied.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifetime token shared by a view and its in-flight fetches.
#[derive(Debug, Clone)]
pub struct ViewScope {
    torn_down: Arc<watch::Sender<bool>>,
}

impl ViewScope {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            torn_down: Arc::new(tx),
        }
    }

    /// Mark the view as gone. Pending and future `run` calls yield `None`.
    pub fn teardown(&self) {
        self.torn_down.send_replace(true);
    }

    pub fn is_active(&self) -> bool {
        !*self.torn_down.borrow()
    }

    /// Drive `fut` unless the view is torn down first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.torn_down.subscribe();
        if *rx.borrow_and_update() {
            return None;
        }

        let torn_down = async move {
            let _ = rx.wait_for(|down| *down).await;
        };

        tokio::select! {
            output = fut => self.is_active().then_some(output),
            _ = torn_down => None,
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_while_active() {
        let scope = ViewScope::new();
        assert_eq!(scope.run(async { 7 }).await, Some(7));
        assert!(scope.is_active());
    }

    #[tokio::test]
    async fn test_teardown_discards_pending_result() {
        let scope = ViewScope::new();
        let view = scope.clone();

        let pending = tokio::spawn(async move {
            view.run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        scope.teardown();

        assert_eq!(pending.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_after_teardown_is_noop() {
        let scope = ViewScope::new();
        scope.teardown();
        assert!(!scope.is_active());
        assert_eq!(scope.run(async { 1 }).await, None);
    }
}
