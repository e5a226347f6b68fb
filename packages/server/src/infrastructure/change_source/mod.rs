//! AccountChangeSource implementations.
//!
//! `mongo` watches the account collection of the production store;
//! `inmemory` is fed directly by the caller and backs tests and local runs.

pub mod inmemory;
pub mod mongo;

pub use inmemory::InMemoryAccountChangeSource;
pub use mongo::{MongoAccountChangeSource, MongoConfig};
