//! Ports - Trait definitions implemented by adapters.

pub mod queue;
pub mod repository;
