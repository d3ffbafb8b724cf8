use crate::core::context::Context;
use crate::core::control::Control;
use crate::job::{Job, JobRef};
use crate::pred::Predicate;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Repeats a job until the flow finishes
///
/// The only exit is the liveness signal, so some job in the tree (or a
/// guard around it) must eventually terminate the flow. The loop yields
/// to the runtime between iterations so timers and sibling tasks make
/// progress even when the body never awaits. A body error stops the
/// loop and is passed upward.
pub struct Loop {
    job: JobRef,
}

impl Loop {
    pub fn new(job: JobRef) -> Self {
        Self { job }
    }
}

#[async_trait]
impl Job for Loop {
    fn name(&self) -> &str {
        "loop"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        let mut iterations: u64 = 0;
        while !ctx.is_done() {
            self.job.execute(ctx, ctrl).await?;
            iterations += 1;
            tokio::task::yield_now().await;
        }
        trace!(iterations, "Loop finished");
        Ok(())
    }
}

/// Runs a job a fixed number of times, stopping early on termination
pub struct Repeat {
    times: usize,
    job: JobRef,
}

impl Repeat {
    pub fn new(times: usize, job: JobRef) -> Self {
        Self { times, job }
    }
}

#[async_trait]
impl Job for Repeat {
    fn name(&self) -> &str {
        "repeat"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        for _ in 0..self.times {
            if ctx.is_done() {
                break;
            }
            self.job.execute(ctx, ctrl).await?;
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Runs a job while the predicate holds and the flow is alive
pub struct While {
    pred: Predicate,
    job: JobRef,
}

impl While {
    pub fn new(pred: Predicate, job: JobRef) -> Self {
        Self { pred, job }
    }
}

#[async_trait]
impl Job for While {
    fn name(&self) -> &str {
        "while"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        while !ctx.is_done() && (self.pred)(ctx) {
            self.job.execute(ctx, ctrl).await?;
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

/// Repeat a job until the flow finishes
pub fn loop_(job: JobRef) -> JobRef {
    Arc::new(Loop::new(job))
}

/// Run a job `times` times
pub fn repeat(times: usize, job: JobRef) -> JobRef {
    Arc::new(Repeat::new(times, job))
}

/// Run a job while `pred` holds
pub fn while_(pred: Predicate, job: JobRef) -> JobRef {
    Arc::new(While::new(pred, job))
}
