//! Engine entry point
//!
//! The engine wires a context/control pair to a root job, runs it on the
//! caller's task and turns the recorded terminal transition into a
//! [`FlowResult`].

use crate::config::{EngineConfig, UnfinishedPolicy};
use crate::core::context::Context;
use crate::core::control::Control;
use crate::core::errors::{FlowError, Result};
use crate::core::result::FlowResult;
use crate::guard;
use crate::job::{escalate, JobRef};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

/// Runs job trees according to an [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `job` against `ctx` and `ctrl` and report the outcome
    ///
    /// Returns [`FlowError::Unfinished`] when the job tree returned without
    /// any terminal transition and the policy is
    /// [`UnfinishedPolicy::Error`], and a configuration error when `ctrl`
    /// is bound to a different context.
    pub async fn run(&self, ctx: &Context, ctrl: &Control, job: JobRef) -> Result<FlowResult> {
        if ctrl.context().id() != ctx.id() {
            return Err(FlowError::configuration_field(
                "control is bound to a different context",
                "ctrl",
            ));
        }

        let span = info_span!("flow", flow_id = %ctx.id());
        self.execute(ctx, ctrl, job).instrument(span).await
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control, job: JobRef) -> Result<FlowResult> {
        let mut root = job;
        if let Some(limit) = self.config.timeout {
            root = guard::timeout(limit, root);
        }
        if self.config.catch_panics {
            root = guard::panic(root);
        }

        debug!(job = root.name(), "Flow started");
        if let Err(err) = root.execute(ctx, ctrl).await {
            escalate(ctrl, root.name(), err);
        }

        let result = ctrl.result();
        if result.is_finished() {
            debug!(state = %result.state, "Flow returned");
            return Ok(result);
        }

        match self.config.unfinished_policy {
            UnfinishedPolicy::Complete => {
                ctrl.complete(Value::Null);
                Ok(ctrl.result())
            }
            UnfinishedPolicy::Error => {
                warn!("Root job returned without a terminal transition");
                // release stragglers and freeze the Running state
                ctrl.seal();
                Err(FlowError::Unfinished)
            }
        }
    }
}

/// Run `job` with the default engine configuration
pub async fn run(ctx: &Context, ctrl: &Control, job: JobRef) -> Result<FlowResult> {
    Engine::default().run(ctx, ctrl, job).await
}
