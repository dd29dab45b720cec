//! Rewrite request parameter settings

use serde::{Deserialize, Serialize};

use crate::error::{Result, RewritrError};

/// Widest sampling temperature the executor accepts.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Parameters for one rewrite request
///
/// A transient value object: built per call, validated by the executor,
/// and consumed within that request. The integer fields are signed to
/// mirror the managed-caller boundary; validation rejects non-positive
/// values before any generation starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteParams {
    /// Maximum number of tokens to generate (soft cap)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,

    /// Temperature for sampling (higher = more random)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Wall-clock budget for the request in milliseconds (soft cap)
    #[serde(default = "default_max_time_ms")]
    pub max_time_ms: i32,

    /// Engine worker threads for this request
    #[serde(default = "default_threads")]
    pub threads: i32,

    /// Context window size requested from the engine
    #[serde(default = "default_context_size")]
    pub context_size: i32,
}

fn default_max_tokens() -> i32 {
    96
}

fn default_temperature() -> f32 {
    0.4
}

fn default_max_time_ms() -> i32 {
    2000
}

fn default_threads() -> i32 {
    2
}

fn default_context_size() -> i32 {
    512
}

impl Default for RewriteParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_time_ms: default_max_time_ms(),
            threads: default_threads(),
            context_size: default_context_size(),
        }
    }
}

impl RewriteParams {
    /// Check all fields against their bounds.
    ///
    /// Returns `InvalidRequest` naming the first offending field. Called by
    /// the executor before any engine work.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens <= 0 {
            return Err(RewritrError::InvalidRequest(format!(
                "max_tokens must be positive, got {}",
                self.max_tokens
            )));
        }
        if self.max_time_ms <= 0 {
            return Err(RewritrError::InvalidRequest(format!(
                "max_time_ms must be positive, got {}",
                self.max_time_ms
            )));
        }
        if self.threads <= 0 {
            return Err(RewritrError::InvalidRequest(format!(
                "threads must be positive, got {}",
                self.threads
            )));
        }
        if self.context_size <= 0 {
            return Err(RewritrError::InvalidRequest(format!(
                "context_size must be positive, got {}",
                self.context_size
            )));
        }
        if !self.temperature.is_finite()
            || self.temperature < 0.0
            || self.temperature > MAX_TEMPERATURE
        {
            return Err(RewritrError::InvalidRequest(format!(
                "temperature must be in [0.0, {}], got {}",
                MAX_TEMPERATURE, self.temperature
            )));
        }
        Ok(())
    }

    /// Create a greedy config (temperature = 0)
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            ..Default::default()
        }
    }

    /// Check if greedy decoding should be used
    pub fn is_greedy(&self) -> bool {
        self.temperature == 0.0
    }
}
