use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Disposition of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    Running,
    Completed,
    Canceled,
    Failed,
}

impl FlowState {
    /// All terminal states
    pub const TERMINAL: [FlowState; 3] =
        [FlowState::Completed, FlowState::Canceled, FlowState::Failed];

    pub fn is_running(self) -> bool {
        self == FlowState::Running
    }

    pub fn is_completed(self) -> bool {
        self == FlowState::Completed
    }

    pub fn is_canceled(self) -> bool {
        self == FlowState::Canceled
    }

    pub fn is_failed(self) -> bool {
        self == FlowState::Failed
    }

    /// True for any terminal state
    pub fn is_finished(self) -> bool {
        !self.is_running()
    }

    /// A state is valid as a final outcome only when it is terminal
    pub fn is_valid(self) -> bool {
        self.is_finished()
    }

    fn bit(self) -> u8 {
        match self {
            FlowState::Running => 1,
            FlowState::Completed => 1 << 1,
            FlowState::Canceled => 1 << 2,
            FlowState::Failed => 1 << 3,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Running => "Running",
            FlowState::Completed => "Completed",
            FlowState::Canceled => "Canceled",
            FlowState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// A set of [`FlowState`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultMask(u8);

impl ResultMask {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Mask of every terminal state
    pub fn all() -> Self {
        Self::from_states(FlowState::TERMINAL)
    }

    pub fn from_states<I: IntoIterator<Item = FlowState>>(states: I) -> Self {
        states
            .into_iter()
            .fold(Self::empty(), |mask, state| mask.with(state))
    }

    pub fn with(self, state: FlowState) -> Self {
        Self(self.0 | state.bit())
    }

    pub fn contains(self, state: FlowState) -> bool {
        self.0 & state.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<FlowState> for ResultMask {
    fn from(state: FlowState) -> Self {
        Self::empty().with(state)
    }
}

/// Payload recorded with the terminal transition
#[derive(Debug, Clone, Default)]
pub enum FlowData {
    #[default]
    None,
    /// Completion payload or cancellation reason
    Value(Value),
    /// Failure cause
    Error(Arc<anyhow::Error>),
}

impl FlowData {
    pub fn is_none(&self) -> bool {
        matches!(self, FlowData::None)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FlowData::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&anyhow::Error> {
        match self {
            FlowData::Error(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<Value> for FlowData {
    fn from(value: Value) -> Self {
        if value.is_null() {
            FlowData::None
        } else {
            FlowData::Value(value)
        }
    }
}

impl From<anyhow::Error> for FlowData {
    fn from(err: anyhow::Error) -> Self {
        FlowData::Error(Arc::new(err))
    }
}

impl fmt::Display for FlowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowData::None => f.write_str("<none>"),
            FlowData::Value(value) => write!(f, "{}", value),
            FlowData::Error(err) => write!(f, "{:#}", err),
        }
    }
}

/// Outcome of a flow: terminal state plus its data
#[derive(Debug, Clone)]
pub struct FlowResult {
    pub state: FlowState,
    pub data: FlowData,
}

impl FlowResult {
    pub fn new(state: FlowState, data: FlowData) -> Self {
        Self { state, data }
    }

    pub fn running() -> Self {
        Self::new(FlowState::Running, FlowData::None)
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Check whether the state belongs to the mask
    pub fn is_any(&self, mask: ResultMask) -> bool {
        mask.contains(self.state)
    }

    /// The failure cause, when the flow failed
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.data.as_error()
    }
}

impl fmt::Display for FlowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.state, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_predicates() {
        assert!(!FlowState::Running.is_valid());
        for state in FlowState::TERMINAL {
            assert!(state.is_finished());
            assert!(state.is_valid());
        }
        assert_eq!(FlowState::Canceled.to_string(), "Canceled");
    }

    #[test]
    fn test_result_mask() {
        let mask = ResultMask::from_states([FlowState::Completed, FlowState::Canceled]);
        assert!(mask.contains(FlowState::Completed));
        assert!(mask.contains(FlowState::Canceled));
        assert!(!mask.contains(FlowState::Failed));
        assert!(!mask.contains(FlowState::Running));

        assert!(ResultMask::empty().is_empty());
        assert!(!ResultMask::all().contains(FlowState::Running));

        let result = FlowResult::new(FlowState::Failed, FlowData::None);
        assert!(result.is_any(ResultMask::all()));
        assert!(!result.is_any(mask));
        assert!(result.is_any(FlowState::Failed.into()));
    }

    #[test]
    fn test_data_conversions() {
        assert!(FlowData::from(Value::Null).is_none());
        let data = FlowData::from(json!({"reason": "user"}));
        assert_eq!(data.as_value(), Some(&json!({"reason": "user"})));
        assert_eq!(data.to_string(), r#"{"reason":"user"}"#);

        let data = FlowData::from(anyhow::anyhow!("broken"));
        assert_eq!(data.as_error().map(|e| e.to_string()), Some("broken".to_string()));
    }
}
