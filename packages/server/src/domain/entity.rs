//! Core domain models for the relay.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{
    error::DeliveryError,
    value_object::{ConnectionId, UserId},
};

/// Full account record after a mutation.
///
/// The relay never interprets the record; it is forwarded in the
/// collaborator's own JSON shape (balances, deposits, withdrawals,
/// investments and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountDocument(serde_json::Value);

impl AccountDocument {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// A change notification for one account record
#[derive(Debug, Clone, PartialEq)]
pub struct AccountChange {
    /// Owner of the changed record
    pub user_id: UserId,
    /// Complete record after the change
    pub document: AccountDocument,
}

impl AccountChange {
    pub fn new(user_id: UserId, document: AccountDocument) -> Self {
        Self { user_id, document }
    }
}

/// Messages pushed from the relay to a connected client
#[derive(Debug, Clone, PartialEq)]
pub enum Push {
    /// The account owned by the connection's user changed
    UserUpdated(AccountDocument),
}

/// Handle to one live client connection.
///
/// Cloning a handle shares the same outbound queue. Equality is identity:
/// two handles are equal when they carry the same ConnectionId.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: UnboundedSender<Push>,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outbound queue.
    ///
    /// The receiver is drained by the connection's writer task; pushes are
    /// delivered in the order they were queued.
    pub fn channel(id: ConnectionId) -> (Self, UnboundedReceiver<Push>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a push for this connection.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::ConnectionClosed` once the writer side is gone
    pub fn push(&self, push: Push) -> Result<(), DeliveryError> {
        self.sender
            .send(push)
            .map_err(|_| DeliveryError::ConnectionClosed(self.id))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionIdFactory;
    use serde_json::json;

    #[test]
    fn test_handle_push_preserves_order() {
        // テスト項目: 同じハンドルへの push はキューに入れた順に受信される
        // given (前提条件):
        let (handle, mut rx) = ConnectionHandle::channel(ConnectionIdFactory::generate());
        let first = AccountDocument::new(json!({"balance": 1}));
        let second = AccountDocument::new(json!({"balance": 2}));

        // when (操作):
        handle.push(Push::UserUpdated(first.clone())).unwrap();
        handle.push(Push::UserUpdated(second.clone())).unwrap();

        // then (期待する結果):
        assert_eq!(rx.try_recv().unwrap(), Push::UserUpdated(first));
        assert_eq!(rx.try_recv().unwrap(), Push::UserUpdated(second));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_handle_push_after_receiver_dropped_fails() {
        // テスト項目: 受信側が破棄されたハンドルへの push は ConnectionClosed になる
        // given (前提条件):
        let id = ConnectionIdFactory::generate();
        let (handle, rx) = ConnectionHandle::channel(id);
        drop(rx);

        // when (操作):
        let result = handle.push(Push::UserUpdated(AccountDocument::new(json!({}))));

        // then (期待する結果):
        assert_eq!(result, Err(DeliveryError::ConnectionClosed(id)));
    }

    #[test]
    fn test_handle_equality_is_identity() {
        // テスト項目: ハンドルの等価性は ConnectionId のみで判定される
        // given (前提条件):
        let id = ConnectionIdFactory::generate();
        let (handle1, _rx1) = ConnectionHandle::channel(id);
        let (handle2, _rx2) = ConnectionHandle::channel(id);
        let (other, _rx3) = ConnectionHandle::channel(ConnectionIdFactory::generate());

        // then (期待する結果):
        assert_eq!(handle1, handle2);
        assert_ne!(handle1, other);
    }
}
