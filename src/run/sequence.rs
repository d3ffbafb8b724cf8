use crate::core::context::Context;
use crate::core::control::Control;
use crate::job::{escalate, Job, JobRef};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Runs jobs one after another on the calling task
///
/// The liveness signal is checked before every child, so once the flow
/// finishes the remaining children are skipped. A child error escalates
/// to a flow failure and stops the sequence.
pub struct Sequence {
    jobs: Vec<JobRef>,
}

impl Sequence {
    pub fn new(jobs: Vec<JobRef>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Job for Sequence {
    fn name(&self) -> &str {
        "sequence"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        for (idx, job) in self.jobs.iter().enumerate() {
            if ctx.is_done() {
                debug!(
                    skipped = self.jobs.len() - idx,
                    "Sequence stopped, flow finished"
                );
                return Ok(());
            }

            if let Err(err) = job.execute(ctx, ctrl).await {
                escalate(ctrl, job.name(), err);
                return Ok(());
            }
        }
        Ok(())
    }
}

/// Run jobs in the given order
pub fn sequence(jobs: Vec<JobRef>) -> JobRef {
    Arc::new(Sequence::new(jobs))
}
