use crate::core::context::Context;
use crate::core::control::Control;
use crate::job::{Job, JobRef};
use crate::pred::Predicate;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Evaluates a predicate once and runs exactly one branch
///
/// Without an else branch a false predicate runs nothing. Errors of the
/// chosen branch are passed upward.
pub struct If {
    pred: Predicate,
    then: JobRef,
    otherwise: Option<JobRef>,
}

impl If {
    pub fn new(pred: Predicate, then: JobRef, otherwise: Option<JobRef>) -> Self {
        Self {
            pred,
            then,
            otherwise,
        }
    }
}

#[async_trait]
impl Job for If {
    fn name(&self) -> &str {
        "if"
    }

    async fn execute(&self, ctx: &Context, ctrl: &Control) -> anyhow::Result<()> {
        let holds = (self.pred)(ctx);
        trace!(holds, "Condition evaluated");

        match (holds, &self.otherwise) {
            (true, _) => self.then.execute(ctx, ctrl).await,
            (false, Some(otherwise)) => otherwise.execute(ctx, ctrl).await,
            (false, None) => Ok(()),
        }
    }
}

/// Run `then` when `pred` holds, otherwise the optional else job
pub fn if_then(pred: Predicate, then: JobRef, otherwise: Option<JobRef>) -> JobRef {
    Arc::new(If::new(pred, then, otherwise))
}

/// Run `then` when `pred` holds, otherwise `otherwise`
pub fn if_else(pred: Predicate, then: JobRef, otherwise: JobRef) -> JobRef {
    if_then(pred, then, Some(otherwise))
}
