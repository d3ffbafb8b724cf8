use crate::core::context::Context;
use crate::core::control::Control;
use crate::job::{Job, JobRef};
use crate::pred::Predicate;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Sleeps, then runs a job; termination interrupts the sleep
pub struct Delay {
    delay: Duration,
    job: JobRef,
}

impl Delay {
    pub fn new(delay: Duration, job: JobRef) -> Self {
        Self { delay, job }
    }
}

#[async_trait]
impl Job for Delay {
    fn name(&self) -> &str {
        "delay"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        tokio::select! {
            _ = ctx.done() => {
                debug!(delay_ms = self.delay.as_millis() as u64, "Delay interrupted");
                Ok(())
            }
            _ = sleep(self.delay) => self.job.execute(ctx, ctrl).await,
        }
    }
}

/// Polls a predicate until it holds or the flow finishes
pub struct Wait {
    pred: Predicate,
    interval: Duration,
}

impl Wait {
    pub fn new(pred: Predicate, interval: Duration) -> Self {
        Self { pred, interval }
    }
}

#[async_trait]
impl Job for Wait {
    fn name(&self) -> &str {
        "wait"
    }

    async fn execute(&self, ctx: &Context, _ctrl: &Control) -> anyhow::Result<()> {
        loop {
            if ctx.is_done() || (self.pred)(ctx) {
                return Ok(());
            }
            tokio::select! {
                _ = ctx.done() => return Ok(()),
                _ = sleep(self.interval) => {}
            }
        }
    }
}

/// Run `job` after `delay`
pub fn delay(delay: Duration, job: JobRef) -> JobRef {
    Arc::new(Delay::new(delay, job))
}

/// Block until `pred` holds, re-checking every `interval`
pub fn wait(pred: Predicate, interval: Duration) -> JobRef {
    Arc::new(Wait::new(pred, interval))
}
