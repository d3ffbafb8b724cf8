//! Concurrent combinators
//!
//! Every child runs on its own tokio task. There is no preemption: when
//! the flow finishes these combinators stop waiting, but a child that
//! ignores [`Context::done`] keeps running in the background until it
//! returns on its own. Such stragglers are a bug in the job, not in the
//! flow; their late errors are discarded.

use crate::core::context::Context;
use crate::core::control::Control;
use crate::core::errors::from_join_error;
use crate::job::{escalate, Job, JobRef};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, error};

type BranchOutcome = (String, Result<anyhow::Result<()>, JoinError>);

fn spawn_branches(
    jobs: &[JobRef],
    ctx: &Context,
    ctrl: &Control,
) -> FuturesUnordered<impl Future<Output = BranchOutcome>> {
    jobs.iter()
        .enumerate()
        .map(|(idx, job)| {
            let job = Arc::clone(job);
            let name = format!("{}#{}", job.name(), idx);
            let ctx = ctx.clone();
            let ctrl = ctrl.clone();
            let handle = tokio::spawn(async move { job.execute(&ctx, &ctrl).await });
            async move { (name, handle.await) }
        })
        .collect()
}

/// Apply a finished branch to the flow: errors and panics become failures
fn settle(ctrl: &Control, (name, outcome): BranchOutcome) {
    match outcome {
        Ok(Ok(())) => debug!(branch = %name, "Branch finished"),
        Ok(Err(err)) => escalate(ctrl, &name, err),
        Err(join_err) => {
            let err = from_join_error(name.clone(), join_err);
            error!(branch = %name, error = %err, "Branch aborted");
            escalate(ctrl, &name, err.into());
        }
    }
}

/// Runs all children concurrently and joins them
///
/// Returns when every child finished or as soon as the flow reaches a
/// terminal state, whichever comes first.
pub struct Parallel {
    jobs: Vec<JobRef>,
}

impl Parallel {
    pub fn new(jobs: Vec<JobRef>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Job for Parallel {
    fn name(&self) -> &str {
        "parallel"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        if ctx.is_done() {
            return Ok(());
        }

        let mut branches = spawn_branches(&self.jobs, ctx, ctrl);
        debug!(branches = branches.len(), "Parallel started");

        loop {
            tokio::select! {
                _ = ctx.done() => {
                    if !branches.is_empty() {
                        debug!(stragglers = branches.len(), "Parallel released, flow finished");
                    }
                    return Ok(());
                }
                next = branches.next() => match next {
                    Some(outcome) => settle(ctrl, outcome),
                    None => return Ok(()),
                },
            }
        }
    }
}

/// Runs all children concurrently and returns after the first one finishes
///
/// The first finished child decides: its error escalates to a failure.
/// The remaining children keep running under the cooperative contract.
pub struct Race {
    jobs: Vec<JobRef>,
}

impl Race {
    pub fn new(jobs: Vec<JobRef>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Job for Race {
    fn name(&self) -> &str {
        "race"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        if ctx.is_done() || self.jobs.is_empty() {
            return Ok(());
        }

        let mut branches = spawn_branches(&self.jobs, ctx, ctrl);
        tokio::select! {
            _ = ctx.done() => {}
            Some(outcome) = branches.next() => {
                debug!(winner = %outcome.0, "Race decided");
                settle(ctrl, outcome);
            }
        }
        Ok(())
    }
}

/// Starts a job on its own task and returns immediately
///
/// Errors and panics of the background job escalate to a failure from
/// the background task.
pub struct Background {
    job: JobRef,
}

impl Background {
    pub fn new(job: JobRef) -> Self {
        Self { job }
    }
}

#[async_trait]
impl Job for Background {
    fn name(&self) -> &str {
        "background"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        if ctx.is_done() {
            return Ok(());
        }

        let job = Arc::clone(&self.job);
        let ctx = ctx.clone();
        let ctrl = ctrl.clone();
        tokio::spawn(async move {
            let name = job.name().to_string();
            let outcome = AssertUnwindSafe(job.execute(&ctx, &ctrl))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => debug!(job = %name, "Background job finished"),
                Ok(Err(err)) => escalate(&ctrl, &name, err),
                Err(payload) => {
                    let err = crate::FlowError::from_panic(name.clone(), payload.as_ref());
                    error!(job = %name, error = %err, "Background job panicked");
                    escalate(&ctrl, &name, err.into());
                }
            }
        });
        Ok(())
    }
}

/// Run jobs concurrently and wait for all of them or for termination
pub fn parallel(jobs: Vec<JobRef>) -> JobRef {
    Arc::new(Parallel::new(jobs))
}

/// Run jobs concurrently and wait for the first one or for termination
pub fn race(jobs: Vec<JobRef>) -> JobRef {
    Arc::new(Race::new(jobs))
}

/// Run a job in the background without waiting for it
pub fn background(job: JobRef) -> JobRef {
    Arc::new(Background::new(job))
}
