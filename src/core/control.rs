//! Termination authority of a flow
//!
//! A [`Control`] records exactly one terminal transition. The first call
//! among `cancel`, `complete` and `fail` wins and broadcasts the liveness
//! signal of the bound [`Context`]; every later call is a no-op.

use super::context::Context;
use super::result::{FlowData, FlowResult, FlowState};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::WaitForCancellationFuture;
use tracing::{debug, info};

#[derive(Debug)]
struct Outcome {
    result: FlowResult,
    /// Set when the flow was abandoned without a terminal transition
    sealed: bool,
}

/// Cloneable handle to the terminal state of one flow
#[derive(Clone)]
pub struct Control {
    ctx: Context,
    outcome: Arc<Mutex<Outcome>>,
}

impl Control {
    /// Create a control bound to the context
    pub fn new(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            outcome: Arc::new(Mutex::new(Outcome {
                result: FlowResult::running(),
                sealed: false,
            })),
        }
    }

    /// Cancel the flow with a reason. Returns true if this call won.
    pub fn cancel(&self, reason: impl Into<Value>) -> bool {
        self.finish(FlowState::Canceled, FlowData::from(reason.into()))
    }

    /// Complete the flow with a payload. Returns true if this call won.
    pub fn complete(&self, payload: impl Into<Value>) -> bool {
        self.finish(FlowState::Completed, FlowData::from(payload.into()))
    }

    /// Fail the flow with an error. Returns true if this call won.
    pub fn fail(&self, err: impl Into<anyhow::Error>) -> bool {
        self.finish(FlowState::Failed, FlowData::from(err.into()))
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.lock().result.state.is_finished()
    }

    /// Snapshot of the current state and data
    pub fn result(&self) -> FlowResult {
        self.outcome.lock().result.clone()
    }

    /// Resolves once any terminal transition happened
    pub fn finished(&self) -> WaitForCancellationFuture<'_> {
        self.ctx.done()
    }

    /// The context this control is bound to
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Refuse every later transition and release the liveness signal
    ///
    /// Used when the flow is abandoned while still Running, so the
    /// recorded state stays Running once `done` has fired.
    pub(crate) fn seal(&self) {
        let mut outcome = self.outcome.lock();
        outcome.sealed = true;
        drop(outcome);
        self.ctx.signal_done();
    }

    fn finish(&self, state: FlowState, data: FlowData) -> bool {
        let mut outcome = self.outcome.lock();
        if outcome.sealed || outcome.result.state.is_finished() {
            debug!(
                flow_id = %self.ctx.id(),
                current = %outcome.result.state,
                attempted = %state,
                sealed = outcome.sealed,
                "Terminal transition dropped, flow already finished"
            );
            return false;
        }

        outcome.result = FlowResult::new(state, data);
        info!(flow_id = %self.ctx.id(), state = %state, data = %outcome.result.data, "Flow finished");
        drop(outcome);

        // state is recorded before the signal so any observer of `done`
        // reads the final result
        self.ctx.signal_done();
        true
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("flow_id", &self.ctx.id())
            .field("state", &self.outcome.lock().result.state)
            .finish()
    }
}
