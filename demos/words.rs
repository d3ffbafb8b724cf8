//! Word statistics over a fixed text
//!
//! Splits the text, counts characters and unique words in parallel, then
//! prints the report.

use jobflow::run::{parallel, sequence};
use jobflow::{from_sync_fn, run, Context, Control, JobRef};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Level;

const TEXT: &str = include_str!("lorem.txt");

fn words(ctx: &Context) -> anyhow::Result<Arc<Vec<String>>> {
    ctx.value::<Vec<String>>("words")
        .ok_or_else(|| anyhow::anyhow!("words missing from context"))
}

fn count(ctx: &Context, key: &str) -> anyhow::Result<usize> {
    ctx.value::<usize>(key)
        .map(|n| *n)
        .ok_or_else(|| anyhow::anyhow!("{} missing from context", key))
}

fn build_flow() -> JobRef {
    let split = from_sync_fn("split", |ctx, _| {
        let text = ctx
            .value::<String>("text")
            .ok_or_else(|| anyhow::anyhow!("text missing from context"))?;
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .collect();
        ctx.add_value("words", words);
        Ok(())
    });

    let count_chars = from_sync_fn("count_chars", |ctx, _| {
        let chars: usize = words(ctx)?.iter().map(|w| w.chars().count()).sum();
        ctx.add_value("chars", chars);
        Ok(())
    });
    let count_unique = from_sync_fn("count_unique", |ctx, _| {
        let unique = words(ctx)?.iter().collect::<HashSet<_>>().len();
        ctx.add_value("unique", unique);
        Ok(())
    });

    let print = from_sync_fn("print", |ctx, ctrl| {
        let words = words(ctx)?.len();
        let unique = count(ctx, "unique")?;
        let chars = count(ctx, "chars")?;
        println!("Words: {}", words);
        println!("Unique words: {}", unique);
        println!("Characters: {}", chars);
        ctrl.complete(serde_json::json!({
            "words": words,
            "unique": unique,
            "chars": chars,
        }));
        Ok(())
    });

    sequence(vec![split, parallel(vec![count_chars, count_unique]), print])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let ctx = Context::new();
    ctx.add_value("text", TEXT.to_string());
    let ctrl = Control::new(&ctx);

    let result = run(&ctx, &ctrl, build_flow()).await?;
    println!("Result: {}", result.state);
    if let Some(err) = result.error() {
        println!("Error: {}", err);
    }
    Ok(())
}
