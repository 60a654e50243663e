use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation token shared by a view and the tasks it starts.
///
/// Cloning shares the same token. Once cancelled a scope stays cancelled.
#[derive(Clone)]
pub struct Scope {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Scope {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Run `fut` inside the scope. Returns `None` if the scope ends first, or
    /// if it ended while the result was on its way.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => {
                if self.is_cancelled() {
                    None
                } else {
                    Some(out)
                }
            }
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
