//! Inference engine seam
//!
//! The tensor engine is an external collaborator; these traits are its
//! contract. A backend opens a validated model container into an
//! [`EngineModel`], and each rewrite request runs one [`Generation`] pass
//! over it. The executor drives generations increment by increment so
//! budgets and cancellation are observed between tokens.

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::error::Result;
use crate::loader::ModelSource;

/// Options handed to the engine when a generation begins
#[derive(Debug, Clone)]
pub struct SamplingOptions {
    /// Sampling temperature (0 = greedy)
    pub temperature: f32,
    /// Engine worker threads for this request
    pub threads: usize,
    /// Context window requested from the engine
    pub context_size: usize,
}

/// A generated token with metadata
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    /// Token ID
    pub token_id: u32,
    /// Decoded text
    pub text: String,
}

/// Trait for inference engine backends
///
/// Implementations wrap a concrete engine (llama.cpp bindings, a candle
/// runtime, ...). `open` must either return fully-initialized resources or
/// an error with nothing left allocated.
pub trait InferenceBackend: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Open a validated model container and allocate engine resources
    ///
    /// Fails with `OutOfMemory` when allocation fails and `InferenceFault`
    /// for other engine-level load errors.
    fn open(&self, source: &ModelSource) -> Result<Arc<dyn EngineModel>>;
}

/// A loaded model's engine resources
///
/// Shared read-only between the session and the executor; generations never
/// mutate the model, so a faulted request leaves it reusable.
pub trait EngineModel: Send + Sync {
    /// Begin a generation pass over the prompt
    fn begin(&self, prompt: &str, options: &SamplingOptions) -> Result<Box<dyn Generation>>;
}

/// One in-progress generation
pub trait Generation: Send {
    /// Produce the next token, or `None` once the model emits EOS
    fn next_token(&mut self) -> Result<Option<GeneratedToken>>;
}
