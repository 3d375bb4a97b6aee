//! Application layer - Generic services that use ports.

pub mod billing;
pub mod orchestrator;
pub mod registry;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;
