//! Guards bound a job by an external condition
//!
//! Timeout and deadline guards race a job against a timer; panic guards
//! contain faults raised on the current task.

pub mod panic;
pub mod timeout;

pub use panic::{ignore_panic, on_panic, panic, PanicGuard, PanicTrigger};
pub use timeout::{
    cancel_on_timeout, complete_on_timeout, deadline, timeout, timeout_with_trigger, Timeout,
    TimeoutTrigger, TriggerId,
};
