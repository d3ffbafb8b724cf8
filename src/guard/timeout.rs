use crate::core::context::Context;
use crate::core::control::Control;
use crate::core::errors::FlowError;
use crate::job::{Job, JobRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Opaque token handed to a trigger to tell nested guards apart
pub type TriggerId = Value;

/// Callback invoked when a guard's timer fires
pub type TimeoutTrigger = Arc<dyn Fn(&Context, &Control, &TriggerId) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Limit {
    After(Duration),
    At(DateTime<Utc>),
}

impl Limit {
    fn remaining(&self) -> Duration {
        match self {
            Limit::After(duration) => *duration,
            Limit::At(deadline) => (*deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

/// Races a job against a timer
///
/// When the timer wins the trigger runs, normally terminating the flow,
/// and the guard then waits for the wrapped job to observe termination
/// and unwind. A job that finishes first disarms the timer.
pub struct Timeout {
    limit: Limit,
    id: TriggerId,
    job: JobRef,
    trigger: TimeoutTrigger,
}

#[async_trait]
impl Job for Timeout {
    fn name(&self) -> &str {
        "timeout"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        let work = self.job.execute(ctx, ctrl);
        tokio::pin!(work);

        tokio::select! {
            res = &mut work => return res,
            _ = ctx.done() => {
                debug!(id = %self.id, "Timer disarmed, flow finished");
            }
            _ = tokio::time::sleep(self.limit.remaining()) => {
                warn!(id = %self.id, limit = ?self.limit, "Timeout fired");
                (self.trigger)(ctx, ctrl, &self.id);
            }
        }

        work.await
    }
}

/// Trigger that completes the flow with a payload
pub fn complete_on_timeout(payload: impl Into<Value>) -> TimeoutTrigger {
    let payload = payload.into();
    Arc::new(move |_: &Context, ctrl: &Control, _: &TriggerId| {
        ctrl.complete(payload.clone());
    })
}

/// Trigger that cancels the flow with a reason
pub fn cancel_on_timeout(reason: impl Into<Value>) -> TimeoutTrigger {
    let reason = reason.into();
    Arc::new(move |_: &Context, ctrl: &Control, _: &TriggerId| {
        ctrl.cancel(reason.clone());
    })
}

/// Bound a job by `duration`; on expiry the flow fails with [`FlowError::Timeout`]
pub fn timeout(duration: Duration, job: JobRef) -> JobRef {
    let timeout_ms = duration.as_millis() as u64;
    let trigger: TimeoutTrigger = Arc::new(move |_: &Context, ctrl: &Control, id: &TriggerId| {
        ctrl.fail(FlowError::timeout(id.clone(), timeout_ms));
    });
    timeout_with_trigger(duration, Value::Null, job, trigger)
}

/// Bound a job by `duration`, invoking `trigger` with `id` on expiry
pub fn timeout_with_trigger(
    duration: Duration,
    id: impl Into<TriggerId>,
    job: JobRef,
    trigger: TimeoutTrigger,
) -> JobRef {
    Arc::new(Timeout {
        limit: Limit::After(duration),
        id: id.into(),
        job,
        trigger,
    })
}

/// Bound a job by a wall-clock deadline, invoking `trigger` with `id` once it passes
///
/// A deadline already in the past fires immediately.
pub fn deadline(
    at: DateTime<Utc>,
    id: impl Into<TriggerId>,
    job: JobRef,
    trigger: Option<TimeoutTrigger>,
) -> JobRef {
    let trigger: TimeoutTrigger = match trigger {
        Some(trigger) => trigger,
        None => Arc::new(move |_: &Context, ctrl: &Control, id: &TriggerId| {
            ctrl.fail(FlowError::deadline_exceeded(id.clone(), at));
        }),
    };
    Arc::new(Timeout {
        limit: Limit::At(at),
        id: id.into(),
        job,
        trigger,
    })
}
