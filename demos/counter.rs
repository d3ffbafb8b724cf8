//! Counts as fast as it can for five seconds
//!
//! Each time the counter reaches a random threshold a new one is drawn.
//! Press Ctrl+C to cancel early.

use jobflow::guard::{complete_on_timeout, timeout_with_trigger};
use jobflow::run::{if_then, loop_, parallel, sequence};
use jobflow::{from_fn, from_sync_fn, pred, run, Context, Control, FlowState, JobRef};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

const TIME_UNIT: Duration = Duration::from_secs(1);
const MAX_THRESHOLD: u64 = 10_000;

#[derive(Debug, Default)]
struct Counter {
    value: u64,
    met: u64,
    threshold: u64,
}

fn counter(ctx: &Context) -> anyhow::Result<Arc<Mutex<Counter>>> {
    ctx.value::<Mutex<Counter>>("counter")
        .ok_or_else(|| anyhow::anyhow!("counter missing from context"))
}

fn build_flow() -> JobRef {
    // Ctrl+C cancels; the flow finishing first stops the listener
    let interrupt = from_fn("interrupt", |ctx, ctrl| async move {
        tokio::select! {
            _ = ctx.done() => {}
            signal = tokio::signal::ctrl_c() => {
                signal?;
                ctrl.cancel("interrupted");
            }
        }
        Ok::<(), anyhow::Error>(())
    });

    let increment = from_sync_fn("increment", |ctx, _| {
        counter(ctx)?.lock().value += 1;
        Ok(())
    });
    let threshold_met = pred::from_fn(|ctx| {
        ctx.value::<Mutex<Counter>>("counter")
            .map(|c| {
                let c = c.lock();
                c.value >= c.threshold
            })
            .unwrap_or(false)
    });
    let next_threshold = from_sync_fn("next_threshold", |ctx, _| {
        let counter = counter(ctx)?;
        let mut c = counter.lock();
        c.met += 1;
        c.threshold = c.value + fastrand::u64(1..=MAX_THRESHOLD);
        info!(value = c.value, next = c.threshold, "Threshold met");
        Ok(())
    });

    timeout_with_trigger(
        TIME_UNIT * 5,
        "counter",
        parallel(vec![
            interrupt,
            loop_(sequence(vec![
                increment,
                if_then(threshold_met, next_threshold, None),
            ])),
        ]),
        complete_on_timeout(json!("time is up")),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let ctx = Context::new();
    ctx.add_value(
        "counter",
        Mutex::new(Counter {
            threshold: fastrand::u64(1..=MAX_THRESHOLD),
            ..Counter::default()
        }),
    );
    let ctrl = Control::new(&ctx);

    let result = run(&ctx, &ctrl, build_flow()).await?;

    match result.state {
        FlowState::Canceled => {
            println!("The flow was canceled with reason {}", result.data);
        }
        FlowState::Completed => {
            let counter = counter(&ctx)?;
            let c = counter.lock();
            println!("The flow was completed");
            println!("Counter value  : {}", c.value);
            println!("Thresholds met : {}", c.met);
            println!("Next threshold : {}", c.threshold);
        }
        state => anyhow::bail!("flow finished in unexpected state {}: {}", state, result.data),
    }
    Ok(())
}
