//! インメモリ Repository 実装

pub mod connection;

pub use connection::InMemoryConnectionRegistry;
