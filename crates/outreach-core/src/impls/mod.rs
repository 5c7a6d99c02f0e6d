//! Port implementations for development and tests.

pub mod memory;
pub mod simulated;

pub use memory::{InMemoryCallStore, InMemoryDirectory, InMemoryTaskStore};
pub use simulated::SimulatedProvider;
