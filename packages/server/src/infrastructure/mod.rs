//! Infrastructure layer: concrete registries, change sources and wire DTOs.

pub mod change_source;
pub mod dto;
pub mod repository;
