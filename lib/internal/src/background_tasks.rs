use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[async_trait]
pub trait BackgroundTask: Send + Sync {
    fn id(&self) -> &str;
    async fn run(&self, token: CancellationToken);
}

/// Owns long-running tasks (supergraph polling and friends) and stops them together.
/// Must be used from within a tokio runtime.
pub struct BackgroundTasksManager {
    cancellation_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for BackgroundTasksManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundTasksManager {
    pub fn new() -> Self {
        Self {
            cancellation_token: CancellationToken::new(),
            tasks: vec![],
            handles: vec![],
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn register_task<T>(&mut self, task: Arc<T>)
    where
        T: BackgroundTask + 'static,
    {
        info!("registering background task: {}", task.id());
        let child_token = self.cancellation_token.child_token();

        self.tasks.push(tokio::spawn(async move {
            task.run(child_token).await;
        }));
    }

    /// Spawns a plain future. It is aborted on shutdown unless it finishes first.
    pub fn register_handle<F>(&mut self, f: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(f));
    }

    pub fn len(&self) -> usize {
        self.tasks.len() + self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn shutdown(self) {
        info!("shutdown triggered, stopping all background tasks...");

        self.cancellation_token.cancel();
        for handle in &self.handles {
            handle.abort();
        }

        // Tasks observe the token and finish on their own.
        let all = self.tasks.into_iter().chain(self.handles);
        for result in join_all(all).await {
            if let Err(err) = result {
                if !err.is_cancelled() {
                    warn!("background task ended abnormally: {}", err);
                }
            }
        }

        info!("all background tasks have been shut down gracefully.");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct WaitForCancel {
        stopped: AtomicBool,
    }

    #[async_trait]
    impl BackgroundTask for WaitForCancel {
        fn id(&self) -> &str {
            "wait-for-cancel"
        }

        async fn run(&self, token: CancellationToken) {
            token.cancelled().await;
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn shutdown_stops_registered_tasks() {
        let task = Arc::new(WaitForCancel {
            stopped: AtomicBool::new(false),
        });
        let mut manager = BackgroundTasksManager::new();
        manager.register_task(task.clone());
        manager.register_handle(futures::future::pending());
        assert_eq!(manager.len(), 2);

        manager.shutdown().await;

        assert!(task.stopped.load(Ordering::SeqCst));
    }
}
