//! Domain layer error definitions.

use thiserror::Error;

use super::value_object::ConnectionId;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,
}

/// Errors raised when pushing to a connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's outbound queue has been closed
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}

/// Errors raised by an account change source
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeStreamError {
    /// Opening the subscription failed
    #[error("failed to open change stream: {0}")]
    Subscribe(String),

    /// The subscription yielded an error after it was opened
    #[error("change stream failed: {0}")]
    Stream(String),

    /// A change event could not be turned into an AccountChange
    #[error("malformed change event: {0}")]
    MalformedEvent(String),
}

impl ChangeStreamError {
    /// Whether the subscription must be reopened after this error.
    ///
    /// A malformed event affects only itself; the stream stays usable.
    pub fn is_disruption(&self) -> bool {
        !matches!(self, Self::MalformedEvent(_))
    }
}
