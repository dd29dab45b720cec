//! Rewrite request executor
//!
//! Runs one rewrite request against a loaded model under token and time
//! budgets, with cooperative cancellation between increments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{EngineModel, SamplingOptions};
use crate::config::RewriteParams;
use crate::error::{Result, RewritrError};

/// Shared cancellation flag, observed at increment boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a rewrite stopped producing tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished on its own
    Eos,
    /// The token budget was reached
    TokenBudget,
    /// The time budget was reached
    Deadline,
}

/// Result of one bounded rewrite
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    /// Generated text (possibly partial when a budget ended the request)
    pub text: String,
    /// Number of tokens produced
    pub tokens: usize,
    /// Wall-clock time spent generating
    pub elapsed: Duration,
    /// What ended the generation
    pub stop: StopReason,
}

/// Rewrite executor
///
/// Borrows the model resources for exactly one request and never mutates
/// them, so a faulted request leaves the model reusable.
pub struct Executor {
    model: Arc<dyn EngineModel>,
}

impl Executor {
    pub fn new(model: Arc<dyn EngineModel>) -> Self {
        Self { model }
    }

    /// Run one rewrite to completion, budget, cancellation, or fault
    ///
    /// Token and time budgets are soft caps: hitting one ends the request
    /// as a success carrying the partial output accumulated so far.
    /// Cancellation discards partial output and fails with `Cancelled`.
    pub fn execute(
        &self,
        input: &str,
        params: &RewriteParams,
        cancel: &CancelFlag,
    ) -> Result<RewriteOutput> {
        params.validate()?;

        let started = Instant::now();
        let deadline = started + Duration::from_millis(params.max_time_ms as u64);
        let max_tokens = params.max_tokens as usize;

        let options = SamplingOptions {
            temperature: params.temperature,
            threads: params.threads as usize,
            context_size: params.context_size as usize,
        };

        let mut generation = self.model.begin(input, &options)?;

        let mut text = String::new();
        let mut produced = 0usize;

        let stop = loop {
            // Cancellation is observed before the budgets: release() wins
            if cancel.is_set() {
                tracing::debug!("Generation cancelled after {} tokens", produced);
                return Err(RewritrError::Cancelled);
            }
            if produced >= max_tokens {
                break StopReason::TokenBudget;
            }
            if Instant::now() >= deadline {
                break StopReason::Deadline;
            }

            match generation.next_token()? {
                Some(token) => {
                    tracing::debug!("Generated token {} / {}", produced + 1, max_tokens);
                    text.push_str(&token.text);
                    produced += 1;
                }
                None => break StopReason::Eos,
            }
        };

        let elapsed = started.elapsed();
        tracing::debug!(
            "Rewrite stopped after {} tokens in {:?} ({:?})",
            produced,
            elapsed,
            stop
        );

        Ok(RewriteOutput {
            text,
            tokens: produced,
            elapsed,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FailureMode, ScriptedBackend};
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn params(max_tokens: i32, max_time_ms: i32) -> RewriteParams {
        RewriteParams {
            max_tokens,
            max_time_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_runs_to_eos() {
        let backend = ScriptedBackend::words("polished text here");
        let executor = Executor::new(backend.model());

        let output = executor
            .execute("rough text", &params(50, 5000), &CancelFlag::new())
            .unwrap();
        assert_eq!(output.text, "polished text here ");
        assert_eq!(output.tokens, 3);
        assert_eq!(output.stop, StopReason::Eos);
    }

    #[test]
    fn test_token_budget_is_soft_cap() {
        let backend = ScriptedBackend::words("one two three four");
        let executor = Executor::new(backend.model());

        let output = executor
            .execute("in", &params(2, 5000), &CancelFlag::new())
            .unwrap();
        assert_eq!(output.tokens, 2);
        assert_eq!(output.text, "one two ");
        assert_eq!(output.stop, StopReason::TokenBudget);
    }

    #[test]
    fn test_invalid_request_starts_no_generation() {
        let backend = ScriptedBackend::words("never");
        let begins = backend.begin_calls.clone();
        let executor = Executor::new(backend.model());

        let err = executor
            .execute("in", &params(0, 5000), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, RewritrError::InvalidRequest(_)));
        assert_eq!(begins.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_tiny_deadline_returns_partial_success() {
        let backend = ScriptedBackend::new(vec!["x"; 200])
            .with_token_delay(Duration::from_millis(20));
        let executor = Executor::new(backend.model());

        let started = Instant::now();
        let output = executor
            .execute("in", &params(200, 1), &CancelFlag::new())
            .unwrap();

        assert_eq!(output.stop, StopReason::Deadline);
        // Overshoot is bounded by one engine increment
        assert!(output.tokens <= 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_discards_partial_output() {
        let backend = ScriptedBackend::words("should not appear");
        let executor = Executor::new(backend.model());

        let cancel = CancelFlag::new();
        cancel.set();
        let err = executor
            .execute("in", &params(50, 5000), &cancel)
            .unwrap_err();
        assert!(matches!(err, RewritrError::Cancelled));
    }

    #[test]
    fn test_fault_leaves_model_reusable() {
        let backend = ScriptedBackend::words("a b c")
            .with_failure(FailureMode::FaultOnceAfter(1));
        let model = backend.model();
        let executor = Executor::new(model);

        let err = executor
            .execute("in", &params(50, 5000), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, RewritrError::InferenceFault(_)));

        // Same resources, next request runs clean
        let output = executor
            .execute("in", &params(50, 5000), &CancelFlag::new())
            .unwrap();
        assert_eq!(output.stop, StopReason::Eos);
        assert_eq!(output.tokens, 3);
    }
}
