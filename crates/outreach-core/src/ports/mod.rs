//! Ports: the seams between the orchestration core and the outside world.
//!
//! Hexagonal layout: the provider, stores and clock are trait objects
//! injected at construction. Business logic never reaches for a global
//! client or constructs its own provider.

pub mod clock;
pub mod provider;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use provider::{CallConfig, CallSnapshot, ProviderError, StartedCall, VoiceProvider};
pub use store::{AgentDirectory, CallStore, StoreError, TaskStore};
