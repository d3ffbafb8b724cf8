//! Shared state of one flow execution
//!
//! The context carries a type-erased key/value store shared by every job
//! in the tree plus the one-shot liveness signal that fires once the flow
//! reaches a terminal state.
//!
//! The store does not serialize access across parallel branches beyond
//! what each stored value does itself. Two sibling branches writing the
//! same key, or mutating the same value without their own locking, is a
//! caller bug.

use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

/// Type-erased payload stored in a [`Context`]
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// Shared key/value state plus liveness signal for one flow
///
/// Cloning is cheap and every clone refers to the same flow.
#[derive(Clone)]
pub struct Context {
    id: Uuid,
    values: Arc<DashMap<String, DynValue>>,
    done: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            values: Arc::new(DashMap::new()),
            done: CancellationToken::new(),
        }
    }

    /// Unique id of this flow, used to tag log output
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get a value by key, downcast to the expected type
    ///
    /// Returns `None` when the key is absent or holds a different type.
    pub fn value<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let raw = self.raw_value(key)?;
        raw.downcast::<T>().ok()
    }

    /// Get the untyped value stored under a key
    pub fn raw_value(&self, key: &str) -> Option<DynValue> {
        self.values.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or overwrite a value; the last write wins
    pub fn add_value<K, T>(&self, key: K, value: T)
    where
        K: Into<String>,
        T: Any + Send + Sync,
    {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Insert an already shared value without wrapping it again
    pub fn add_shared<K: Into<String>>(&self, key: K, value: DynValue) {
        self.values.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a value, returning it if present
    pub fn remove_value(&self, key: &str) -> Option<DynValue> {
        self.values.remove(key).map(|(_, value)| value)
    }

    /// Resolves once the flow has been terminated
    pub fn done(&self) -> WaitForCancellationFuture<'_> {
        self.done.cancelled()
    }

    /// Non-blocking check of the liveness signal
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// A token that is cancelled together with the flow
    ///
    /// Cancelling the returned token does not terminate the flow; use
    /// [`crate::Control`] for that.
    pub fn done_token(&self) -> CancellationToken {
        self.done.child_token()
    }

    pub(crate) fn signal_done(&self) {
        self.done.cancel();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("values", &self.values.len())
            .field("done", &self.is_done())
            .finish()
    }
}
