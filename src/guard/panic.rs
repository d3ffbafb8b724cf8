use crate::core::context::Context;
use crate::core::control::Control;
use crate::core::errors::FlowError;
use crate::job::{Job, JobRef};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// Callback receiving a contained panic
pub type PanicTrigger = Arc<dyn Fn(&Context, &Control, FlowError) + Send + Sync>;

/// Contains panics raised while a job runs on the current task
///
/// A contained panic is handed to the trigger and the guard returns
/// normally; the wrapped job does not resume.
pub struct PanicGuard {
    job: JobRef,
    trigger: PanicTrigger,
}

impl PanicGuard {
    pub fn new(job: JobRef, trigger: PanicTrigger) -> Self {
        Self { job, trigger }
    }
}

#[async_trait]
impl Job for PanicGuard {
    fn name(&self) -> &str {
        self.job.name()
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        match AssertUnwindSafe(self.job.execute(ctx, ctrl))
            .catch_unwind()
            .await
        {
            Ok(res) => res,
            Err(payload) => {
                let err = FlowError::from_panic(self.job.name(), payload.as_ref());
                error!(job = self.job.name(), error = %err, "Panic contained");
                (self.trigger)(ctx, ctrl, err);
                Ok(())
            }
        }
    }
}

/// Contain panics and fail the flow with [`FlowError::Panicked`]
pub fn panic(job: JobRef) -> JobRef {
    on_panic(
        job,
        Arc::new(|_: &Context, ctrl: &Control, err: FlowError| {
            ctrl.fail(err);
        }),
    )
}

/// Contain panics and only log them
pub fn ignore_panic(job: JobRef) -> JobRef {
    on_panic(job, Arc::new(|_: &Context, _: &Control, _: FlowError| {}))
}

/// Contain panics and hand them to `trigger`
pub fn on_panic(job: JobRef, trigger: PanicTrigger) -> JobRef {
    Arc::new(PanicGuard::new(job, trigger))
}
