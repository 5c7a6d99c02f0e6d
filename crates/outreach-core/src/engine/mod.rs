//! Task retry/escalation engine.
//!
//! Split the way deciders usually are: `decision` is the pure function from
//! classified outcome to next action; `apply` executes that action against
//! the task record.

pub mod apply;
pub mod decision;

pub use apply::{RetryConfig, TaskEngine, TaskTransition, TransitionKind};
pub use decision::{decide, Decision, DecisionInput};
