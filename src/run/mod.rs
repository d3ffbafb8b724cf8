//! Control-flow combinators
//!
//! Every combinator is itself a [`Job`](crate::Job) built from child
//! jobs, immutable once constructed, and threads the same context and
//! control through its children.
//!
//! Child errors escalate to a flow failure at [`sequence`], [`parallel`],
//! [`race`] and [`background`] boundaries. Loops, conditionals and
//! timing combinators pass a child error upward unchanged.

pub mod conditional;
pub mod loops;
pub mod parallel;
pub mod sequence;
pub mod timing;

pub use conditional::{if_else, if_then, If};
pub use loops::{loop_, repeat, while_, Loop, Repeat, While};
pub use parallel::{background, parallel, race, Background, Parallel, Race};
pub use sequence::{sequence, Sequence};
pub use timing::{delay, wait, Delay, Wait};
