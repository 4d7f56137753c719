//! Test doubles for the resolver (always available for integration tests)

pub mod clock;
pub mod provider;

pub use clock::ManualClock;
pub use provider::ScriptedProvider;
