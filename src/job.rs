//! The job execution contract
//!
//! A job is a unit of work executed against a [`Context`] and a
//! [`Control`]. Jobs hold no flow state of their own; everything mutable
//! lives in the context's values.

use crate::core::context::Context;
use crate::core::control::Control;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A unit of work composed into a flow
///
/// Returning an error escalates to [`Control::fail`] at the nearest
/// sequence, parallel, race, background or engine boundary, unless the
/// flow already finished, in which case the error is discarded.
///
/// Jobs are expected to watch [`Context::done`] while waiting on anything
/// external. Nothing preempts a job that ignores it.
#[async_trait]
pub trait Job: Send + Sync {
    /// Human readable name used in logs and panic reports
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()>;
}

/// Shared handle to a job, the unit combinators compose
pub type JobRef = Arc<dyn Job>;

/// Record a job error as the flow failure
///
/// Errors arriving after the flow finished are discarded.
pub(crate) fn escalate(ctrl: &Control, job: &str, err: anyhow::Error) {
    if ctrl.is_finished() {
        debug!(job, error = %err, "Job error discarded, flow already finished");
        return;
    }
    if !ctrl.fail(err) {
        debug!(job, "Job error lost the race to another terminal transition");
    }
}

/// Job backed by an async closure
pub struct FnJob<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn(Context, Control) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        (self.func)(ctx.clone(), ctrl.clone()).await
    }
}

/// Job backed by a synchronous closure
pub struct SyncFnJob<F> {
    name: String,
    func: F,
}

#[async_trait]
impl<F> Job for SyncFnJob<F>
where
    F: Fn(&Context, &Control) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        (self.func)(ctx, ctrl)
    }
}

/// Build a job from an async closure
pub fn from_fn<F, Fut>(name: impl Into<String>, func: F) -> JobRef
where
    F: Fn(Context, Control) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnJob {
        name: name.into(),
        func,
    })
}

/// Build a job from a synchronous closure
pub fn from_sync_fn<F>(name: impl Into<String>, func: F) -> JobRef
where
    F: Fn(&Context, &Control) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(SyncFnJob {
        name: name.into(),
        func,
    })
}

/// A job that does nothing
pub fn noop() -> JobRef {
    from_sync_fn("noop", |_, _| Ok(()))
}

/// A job that completes the flow with a payload
pub fn complete_with(payload: impl Into<Value>) -> JobRef {
    let payload = payload.into();
    from_sync_fn("complete", move |_, ctrl| {
        ctrl.complete(payload.clone());
        Ok(())
    })
}

/// A job that cancels the flow with a reason
pub fn cancel_with(reason: impl Into<Value>) -> JobRef {
    let reason = reason.into();
    from_sync_fn("cancel", move |_, ctrl| {
        ctrl.cancel(reason.clone());
        Ok(())
    })
}

/// A job that fails the flow with a message
pub fn fail_with(message: impl Into<String>) -> JobRef {
    let message = message.into();
    from_sync_fn("fail", move |_, ctrl| {
        ctrl.fail(crate::FlowError::job(message.clone()));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::FlowState;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_fn_jobs_execute() {
        let ctx = Context::new();
        let ctrl = Control::new(&ctx);
        ctx.add_value("hits", AtomicU32::new(0));

        let async_job = from_fn("async-hit", |ctx, _ctrl| async move {
            ctx.value::<AtomicU32>("hits").unwrap().fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let sync_job = from_sync_fn("sync-hit", |ctx, _ctrl| {
            ctx.value::<AtomicU32>("hits").unwrap().fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        async_job.execute(&ctx, &ctrl).await.unwrap();
        sync_job.execute(&ctx, &ctrl).await.unwrap();

        assert_eq!(ctx.value::<AtomicU32>("hits").unwrap().load(Ordering::SeqCst), 2);
        assert_eq!(async_job.name(), "async-hit");
        assert_eq!(sync_job.name(), "sync-hit");
    }

    #[tokio::test]
    async fn test_terminal_jobs() {
        let ctx = Context::new();
        let ctrl = Control::new(&ctx);

        cancel_with("stop").execute(&ctx, &ctrl).await.unwrap();
        complete_with(1).execute(&ctx, &ctrl).await.unwrap();

        assert_eq!(ctrl.result().state, FlowState::Canceled);
    }

    #[test]
    fn test_escalate_respects_finished_flow() {
        let ctx = Context::new();
        let ctrl = Control::new(&ctx);

        escalate(&ctrl, "first", anyhow::anyhow!("first error"));
        escalate(&ctrl, "second", anyhow::anyhow!("second error"));

        let result = ctrl.result();
        assert!(result.is_failed());
        assert_eq!(result.error().unwrap().to_string(), "first error");
    }
}
