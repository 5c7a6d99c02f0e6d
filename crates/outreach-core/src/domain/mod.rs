//! Domain model (ids, tasks, calls, outcomes, audit records).

pub mod agent;
pub mod call;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod task;
pub mod timeline;

pub use agent::{AgentKind, AgentProfile};
pub use call::{CallAnalysis, CallAttempt, CallStatus, Speaker, TranscriptTurn};
pub use errors::OrchestrateError;
pub use ids::{AgentId, CallId, TaskId};
pub use outcome::{classify, retry_tag, Outcome};
pub use task::{Task, TaskStatus, DEFAULT_MAX_RETRIES};
pub use timeline::{RetryAttempt, RetryOutcomeTag, TimelineEvent};
