//! Predicates over the flow context
//!
//! Predicates are pure reads of context state used by conditional and
//! repeating combinators.

use crate::core::context::Context;
use std::sync::Arc;

/// Shared boolean test over a [`Context`]
pub type Predicate = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Wrap a closure into a [`Predicate`]
pub fn from_fn<F>(func: F) -> Predicate
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    Arc::new(func)
}

pub fn always() -> Predicate {
    from_fn(|_| true)
}

pub fn never() -> Predicate {
    from_fn(|_| false)
}

pub fn not(pred: Predicate) -> Predicate {
    from_fn(move |ctx| !pred(ctx))
}

/// True when every predicate holds; short-circuits
pub fn and(preds: Vec<Predicate>) -> Predicate {
    from_fn(move |ctx| preds.iter().all(|pred| pred(ctx)))
}

/// True when any predicate holds; short-circuits
pub fn or(preds: Vec<Predicate>) -> Predicate {
    from_fn(move |ctx| preds.iter().any(|pred| pred(ctx)))
}

/// True when exactly one of the two holds
pub fn xor(left: Predicate, right: Predicate) -> Predicate {
    from_fn(move |ctx| left(ctx) != right(ctx))
}
