//! Ports implemented by the infrastructure layer.
//!
//! The use cases depend on these traits only; concrete registries and change
//! sources are injected at startup (dependency inversion).

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::{
    entity::{AccountChange, ConnectionHandle, Push},
    error::{ChangeStreamError, DeliveryError},
    value_object::{ConnectionId, UserId},
};

/// Live stream of account changes.
///
/// `None` means the store closed the subscription.
pub type AccountChangeStream = BoxStream<'static, Result<AccountChange, ChangeStreamError>>;

/// Process-local mapping from user to the connection currently representing it.
///
/// Implementations must make every operation atomic with respect to the others.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Insert or replace the mapping for `user_id`.
    ///
    /// Returns the connection that was displaced, if any. The displaced
    /// connection is not closed.
    async fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionId>;

    /// Remove the entry owned by `connection_id`, if it still owns one.
    ///
    /// Returns the user whose mapping was removed.
    async fn unregister(&self, connection_id: ConnectionId) -> Option<UserId>;

    /// Current connection for `user_id`.
    async fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle>;

    /// Queue `push` on the connection currently registered for `user_id`.
    ///
    /// The lookup and the enqueue happen under the same lock as `register`
    /// and `unregister`, so the push can only reach a connection that still
    /// represents `user_id`. Returns `None` when no connection is registered.
    /// A connection found closed is removed from the registry and reported as
    /// `DeliveryError::ConnectionClosed`.
    async fn deliver(
        &self,
        user_id: &UserId,
        push: Push,
    ) -> Option<Result<ConnectionId, DeliveryError>>;

    /// Number of users with a registered connection.
    async fn count(&self) -> usize;
}

/// Subscribable source of account change events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountChangeSource: Send + Sync {
    /// Open a new subscription.
    ///
    /// Only changes made after the subscription is open are delivered.
    async fn subscribe(&self) -> Result<AccountChangeStream, ChangeStreamError>;
}
