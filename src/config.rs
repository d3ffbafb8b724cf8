use crate::core::errors::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the engine reports when the root job returns without any
/// terminal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnfinishedPolicy {
    /// Report [`FlowError::Unfinished`]; the job tree is malformed
    Error,
    /// Treat natural return as completion with no data
    Complete,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub unfinished_policy: UnfinishedPolicy,
    /// Contain panics raised on the root task, not only in parallel branches
    pub catch_panics: bool,
    /// Optional bound on the whole flow; expiry fails with [`FlowError::Timeout`]
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unfinished_policy: UnfinishedPolicy::Error,
            catch_panics: true,
            timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(FlowError::configuration_field(
                    "timeout must be greater than 0",
                    "timeout",
                ));
            }
        }
        Ok(())
    }
}

/// Builder for EngineConfig
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn unfinished_policy(mut self, policy: UnfinishedPolicy) -> Self {
        self.config.unfinished_policy = policy;
        self
    }

    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.config.catch_panics = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
