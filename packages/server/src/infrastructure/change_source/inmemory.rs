//! In-process change source.

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::{
    Mutex,
    mpsc::{self, UnboundedSender},
};

use crate::domain::{AccountChange, AccountChangeSource, AccountChangeStream, ChangeStreamError};

type ChangeSender = UnboundedSender<Result<AccountChange, ChangeStreamError>>;

/// Change source whose events are published by the caller.
///
/// Each subscription gets its own queue. Like a real change stream, a
/// subscription only sees events published after it was opened.
#[derive(Default)]
pub struct InMemoryAccountChangeSource {
    subscribers: Mutex<Vec<ChangeSender>>,
}

impl InMemoryAccountChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a change to every open subscription.
    ///
    /// Returns the number of subscriptions that received it.
    pub async fn publish(&self, change: AccountChange) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|tx| tx.send(Ok(change.clone())).is_ok());
        subscribers.len()
    }

    /// Fail every open subscription with `error` and close it.
    pub async fn disrupt(&self, error: ChangeStreamError) {
        let mut subscribers = self.subscribers.lock().await;
        for tx in subscribers.drain(..) {
            let _ = tx.send(Err(error.clone()));
        }
    }

    /// Close every open subscription without an error.
    pub async fn close_all(&self) {
        self.subscribers.lock().await.clear();
    }

    /// Number of subscriptions still being fed.
    pub async fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl AccountChangeSource for InMemoryAccountChangeSource {
    async fn subscribe(&self) -> Result<AccountChangeStream, ChangeStreamError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(tx);

        let changes = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(changes.boxed())
    }
}
