// Core infrastructure modules
pub mod core {
    pub mod context;
    pub mod control;
    pub mod errors;
    pub mod result;
}

pub mod config;
pub mod engine;
pub mod guard;   // Timeout, deadline and panic guards
pub mod job;
pub mod pred;
pub mod run;     // Control-flow combinators

// Re-exports for convenience
pub use crate::core::context::Context;
pub use crate::core::control::Control;
pub use crate::core::errors::{FlowError, Result};
pub use crate::core::result::{FlowData, FlowResult, FlowState, ResultMask};
pub use config::{EngineConfig, EngineConfigBuilder, UnfinishedPolicy};
pub use engine::{run, Engine};
pub use job::{from_fn, from_sync_fn, Job, JobRef};
pub use pred::Predicate;
