//! Termination semantics of composed flows
//!
//! Exercises the engine end to end: first-writer-wins under contention,
//! early exit of sequences and parallel groups, loops bounded by guards,
//! and containment of errors and panics.

use jobflow::run::{if_else, loop_, parallel, race, sequence};
use jobflow::{
    from_fn, from_sync_fn, guard, pred, run, Context, Control, FlowError, FlowState, JobRef,
    ResultMask,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

fn trace_ctx() -> (Context, Control) {
    let ctx = Context::new();
    ctx.add_value("trace", Mutex::new(Vec::<String>::new()));
    let ctrl = Control::new(&ctx);
    (ctx, ctrl)
}

fn record(step: &'static str) -> JobRef {
    from_sync_fn(step, move |ctx, _| {
        ctx.value::<Mutex<Vec<String>>>("trace")
            .unwrap()
            .lock()
            .push(step.to_string());
        Ok(())
    })
}

fn trace(ctx: &Context) -> Vec<String> {
    ctx.value::<Mutex<Vec<String>>>("trace").unwrap().lock().clone()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_terminations_single_winner() {
    const BRANCHES: u32 = 32;

    for _ in 0..20 {
        let ctx = Context::new();
        ctx.add_value("winners", AtomicU32::new(0));
        let ctrl = Control::new(&ctx);

        let branches: Vec<JobRef> = (0..BRANCHES)
            .map(|i| {
                from_sync_fn(format!("terminate-{}", i), move |ctx, ctrl| {
                    let won = match i % 3 {
                        0 => ctrl.cancel(i),
                        1 => ctrl.complete(i),
                        _ => ctrl.fail(anyhow::anyhow!("branch {}", i)),
                    };
                    if won {
                        ctx.value::<AtomicU32>("winners")
                            .unwrap()
                            .fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(())
                })
            })
            .collect();

        let result = run(&ctx, &ctrl, parallel(branches)).await.unwrap();

        // stragglers may still be running; give them time to attempt their transition
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctx.value::<AtomicU32>("winners").unwrap().load(Ordering::SeqCst), 1);
        assert!(result.is_any(ResultMask::all()));
        assert_eq!(ctrl.result().state, result.state);
    }
}

#[tokio::test]
async fn test_sequence_cancel_skips_rest() {
    let (ctx, ctrl) = trace_ctx();
    let cancel_b = from_sync_fn("b", |ctx, ctrl| {
        ctx.value::<Mutex<Vec<String>>>("trace")
            .unwrap()
            .lock()
            .push("b".to_string());
        ctrl.cancel(json!({"by": "b"}));
        Ok(())
    });

    let result = run(&ctx, &ctrl, sequence(vec![record("a"), cancel_b, record("c")]))
        .await
        .unwrap();

    assert_eq!(result.state, FlowState::Canceled);
    assert_eq!(result.data.as_value(), Some(&json!({"by": "b"})));
    assert_eq!(trace(&ctx), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_complete_does_not_wait_for_straggler() {
    let ctx = Context::new();
    ctx.add_value("straggler_done", AtomicBool::new(false));
    let ctrl = Control::new(&ctx);

    let a = from_sync_fn("a", |_, ctrl| {
        ctrl.complete("a");
        Ok(())
    });
    // unresponsive on purpose: never looks at the liveness signal
    let b = from_fn("b", |ctx, ctrl| async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        ctrl.fail(anyhow::anyhow!("b finished late"));
        ctx.value::<AtomicBool>("straggler_done")
            .unwrap()
            .store(true, Ordering::SeqCst);
        Ok(())
    });

    let started = Instant::now();
    let result = run(&ctx, &ctrl, parallel(vec![a, b])).await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(result.state, FlowState::Completed);
    assert!(!ctx.value::<AtomicBool>("straggler_done").unwrap().load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(ctx.value::<AtomicBool>("straggler_done").unwrap().load(Ordering::SeqCst));
    assert_eq!(ctrl.result().state, FlowState::Completed);
    assert_eq!(ctrl.result().data.as_value(), Some(&json!("a")));
}

#[tokio::test]
async fn test_loop_bounded_by_timeout_guard() {
    let ctx = Context::new();
    ctx.add_value("iterations", AtomicU64::new(0));
    let ctrl = Control::new(&ctx);

    let spin = from_sync_fn("spin", |ctx, _| {
        ctx.value::<AtomicU64>("iterations")
            .unwrap()
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let limit = Duration::from_millis(100);
    let flow = guard::timeout_with_trigger(
        limit,
        "loop-guard",
        loop_(spin),
        guard::complete_on_timeout(json!("timed out")),
    );

    let started = Instant::now();
    let result = run(&ctx, &ctrl, flow).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.state, FlowState::Completed);
    assert!(elapsed >= limit);
    assert!(elapsed < limit + Duration::from_millis(500), "took {:?}", elapsed);
    assert!(ctx.value::<AtomicU64>("iterations").unwrap().load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_conditional_runs_exactly_one_branch() {
    for (count, expected) in [(2u64, "else"), (5, "then"), (8, "then")] {
        let (ctx, ctrl) = trace_ctx();
        ctx.add_value("count", count);
        ctx.add_value("threshold", 5u64);

        let met = pred::from_fn(|ctx| {
            *ctx.value::<u64>("count").unwrap() >= *ctx.value::<u64>("threshold").unwrap()
        });
        let flow = sequence(vec![
            if_else(met, record("then"), record("else")),
            jobflow::job::complete_with(json!(null)),
        ]);

        run(&ctx, &ctrl, flow).await.unwrap();
        assert_eq!(trace(&ctx), vec![expected.to_string()]);
    }
}

#[tokio::test]
async fn test_error_after_completion_is_discarded() {
    let ctx = Context::new();
    let ctrl = Control::new(&ctx);

    let complete = from_sync_fn("complete", |_, ctrl| {
        ctrl.complete("first");
        Ok(())
    });
    let late_error = from_fn("late_error", |ctx, _| async move {
        ctx.done().await;
        Err(anyhow::anyhow!("too late"))
    });

    let result = run(&ctx, &ctrl, parallel(vec![late_error, complete]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(result.state, FlowState::Completed);
    assert_eq!(ctrl.result().state, FlowState::Completed);
}

#[tokio::test]
async fn test_parallel_panic_becomes_failure() {
    let ctx = Context::new();
    let ctrl = Control::new(&ctx);

    let faulty = from_sync_fn("faulty", |_, _| panic!("index out of range"));
    let waiter = from_fn("waiter", |ctx, _| async move {
        ctx.done().await;
        Ok(())
    });

    let result = run(&ctx, &ctrl, parallel(vec![waiter, faulty])).await.unwrap();

    assert_eq!(result.state, FlowState::Failed);
    let err = result.error().unwrap().downcast_ref::<FlowError>().unwrap();
    match err {
        FlowError::Panicked { job, message } => {
            assert!(job.starts_with("faulty"), "job: {}", job);
            assert_eq!(message, "index out of range");
        }
        other => panic!("Expected panic error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_race_with_guarded_sleeper() {
    let ctx = Context::new();
    let ctrl = Control::new(&ctx);

    let sleeper = from_fn("sleeper", |ctx, ctrl| async move {
        tokio::select! {
            _ = ctx.done() => {}
            _ = tokio::time::sleep(Duration::from_secs(10)) => {
                ctrl.complete("sleeper");
            }
        }
        Ok(())
    });
    let quick = from_sync_fn("quick", |_, ctrl| {
        ctrl.cancel("quick won");
        Ok(())
    });

    let result = run(&ctx, &ctrl, race(vec![sleeper, quick])).await.unwrap();

    assert_eq!(result.state, FlowState::Canceled);
    assert_eq!(result.data.as_value(), Some(&json!("quick won")));
}

#[tokio::test]
async fn test_tree_without_termination_is_construction_error() {
    let (ctx, ctrl) = trace_ctx();

    let err = run(&ctx, &ctrl, sequence(vec![record("a"), record("b")]))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Unfinished));
    assert_eq!(trace(&ctx), vec!["a".to_string(), "b".to_string()]);
}
