//! Domain layer for the relay.
//!
//! This module contains the relay's model and ports, independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{AccountChange, AccountDocument, ConnectionHandle, Push};
pub use error::{ChangeStreamError, DeliveryError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{AccountChangeSource, AccountChangeStream, ConnectionRegistry};
pub use value_object::{ConnectionId, UserId};
