//! Application layer - Services that use ports.

pub mod cleanup;
pub mod intake;
pub mod janitor;
pub mod pending;
pub mod registry;
pub mod runner;
pub mod trim;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;
