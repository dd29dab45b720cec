//! Scripted backend for exercising the session core in tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{EngineModel, GeneratedToken, Generation, InferenceBackend, SamplingOptions};
use crate::error::{Result, RewritrError};
use crate::loader::ModelSource;

/// How the scripted backend should misbehave, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    None,
    /// `open` reports allocation failure once `n` opens have succeeded
    OutOfMemoryAfterOpens(usize),
    /// The first generation faults after yielding `n` tokens; later
    /// generations run clean
    FaultOnceAfter(usize),
}

/// Backend that replays a fixed token script for every generation
pub struct ScriptedBackend {
    tokens: Vec<String>,
    token_delay: Duration,
    open_delay: Duration,
    failure: FailureMode,
    pub live_models: Arc<AtomicUsize>,
    pub open_calls: Arc<AtomicUsize>,
    pub begin_calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new<S: Into<String>>(tokens: Vec<S>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            token_delay: Duration::ZERO,
            open_delay: Duration::ZERO,
            failure: FailureMode::None,
            live_models: Arc::new(AtomicUsize::new(0)),
            open_calls: Arc::new(AtomicUsize::new(0)),
            begin_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script that yields each whitespace-separated word of `text`
    pub fn words(text: &str) -> Self {
        Self::new(text.split_whitespace().map(|w| format!("{w} ")).collect())
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_failure(mut self, failure: FailureMode) -> Self {
        self.failure = failure;
        self
    }

    /// Build the engine model directly, bypassing container detection
    pub fn model(&self) -> Arc<dyn EngineModel> {
        Arc::new(ScriptedModel {
            tokens: self.tokens.clone(),
            token_delay: self.token_delay,
            fault_after: match self.failure {
                FailureMode::FaultOnceAfter(n) => Some(n),
                _ => None,
            },
            fault_armed: AtomicBool::new(true),
            begin_calls: Arc::clone(&self.begin_calls),
            _live: LiveGuard(Arc::clone(&self.live_models)),
        })
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&self, _source: &ModelSource) -> Result<Arc<dyn EngineModel>> {
        if !self.open_delay.is_zero() {
            std::thread::sleep(self.open_delay);
        }
        let opened_before = self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let FailureMode::OutOfMemoryAfterOpens(n) = self.failure {
            if opened_before >= n {
                return Err(RewritrError::OutOfMemory(
                    "scripted allocation failure".to_string(),
                ));
            }
        }
        self.live_models.fetch_add(1, Ordering::SeqCst);
        Ok(self.model())
    }
}

/// Decrements the live-model counter when the engine resources drop
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ScriptedModel {
    tokens: Vec<String>,
    token_delay: Duration,
    fault_after: Option<usize>,
    fault_armed: AtomicBool,
    begin_calls: Arc<AtomicUsize>,
    _live: LiveGuard,
}

impl EngineModel for ScriptedModel {
    fn begin(&self, _prompt: &str, _options: &SamplingOptions) -> Result<Box<dyn Generation>> {
        self.begin_calls.fetch_add(1, Ordering::SeqCst);
        let fault_after = if self.fault_armed.swap(false, Ordering::SeqCst) {
            self.fault_after
        } else {
            None
        };
        Ok(Box::new(ScriptedGeneration {
            tokens: self.tokens.clone().into_iter(),
            token_delay: self.token_delay,
            fault_after,
            yielded: 0,
        }))
    }
}

struct ScriptedGeneration {
    tokens: std::vec::IntoIter<String>,
    token_delay: Duration,
    fault_after: Option<usize>,
    yielded: usize,
}

impl Generation for ScriptedGeneration {
    fn next_token(&mut self) -> Result<Option<GeneratedToken>> {
        if !self.token_delay.is_zero() {
            std::thread::sleep(self.token_delay);
        }
        if let Some(n) = self.fault_after {
            if self.yielded >= n {
                return Err(RewritrError::InferenceFault(
                    "scripted fault".to_string(),
                ));
            }
        }
        match self.tokens.next() {
            Some(text) => {
                let token = GeneratedToken {
                    token_id: self.yielded as u32,
                    text,
                };
                self.yielded += 1;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }
}

/// Write a minimal valid GGUF container for load-path tests
pub fn write_stub_gguf(dir: &Path, name: &str) -> PathBuf {
    fn push_str(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(b"GGUF");
    buf.extend_from_slice(&3u32.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes()); // tensors
    buf.extend_from_slice(&2u64.to_le_bytes()); // metadata entries

    push_str(&mut buf, "general.architecture");
    buf.extend_from_slice(&8u32.to_le_bytes());
    push_str(&mut buf, "llama");

    push_str(&mut buf, "llama.context_length");
    buf.extend_from_slice(&4u32.to_le_bytes());
    buf.extend_from_slice(&2048u32.to_le_bytes());

    let path = dir.join(name);
    std::fs::write(&path, &buf).unwrap();
    path
}
