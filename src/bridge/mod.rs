//! Boundary adapter for the managed caller
//!
//! `RewriteBridge` translates the session core into the surface the managed
//! application layer consumes: booleans for lifecycle calls, a plain string
//! for rewrites, and a last-error accessor for callers that need detail.
//! The FFI marshalling itself (JNI or otherwise) lives outside this crate;
//! this is the contract it wraps.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::backend::InferenceBackend;
use crate::config::{RewriteParams, RewritrConfig};
use crate::engine::{Session, SessionState};
use crate::error::Result;

/// Model status reported to the managed caller
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub path: Option<PathBuf>,
    pub size_mb: Option<u64>,
}

/// Managed-caller adapter around one inference session
///
/// One bridge per logical assistant context; it owns its session and no
/// ambient process state.
pub struct RewriteBridge {
    session: Session,
    defaults: RewriteParams,
    configured_model: Option<PathBuf>,
    last_error: Mutex<Option<String>>,
}

impl RewriteBridge {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            session: Session::new(backend),
            defaults: RewriteParams::default(),
            configured_model: None,
            last_error: Mutex::new(None),
        }
    }

    /// Build a bridge whose default rewrite parameters and model path come
    /// from config
    pub fn from_config(backend: Arc<dyn InferenceBackend>, config: &RewritrConfig) -> Self {
        Self {
            session: Session::new(backend),
            defaults: config.rewrite.clone(),
            configured_model: config.model_path.clone(),
            last_error: Mutex::new(None),
        }
    }

    /// Initialize the session; safe to call multiple times
    pub async fn init(&self) -> bool {
        self.record(self.session.init().await).is_some()
    }

    /// Load a model container; `false` on any load failure
    ///
    /// Error detail is available through [`last_error`](Self::last_error).
    pub async fn load_model(&self, path: &str) -> bool {
        self.record(self.session.load_model(path).await).is_some()
    }

    /// Load the model named in the bridge's config, if any
    pub async fn load_configured_model(&self) -> bool {
        let Some(path) = self.configured_model.clone() else {
            *self.last_error.lock().unwrap() = Some("no model path configured".to_string());
            return false;
        };
        self.record(self.session.load_model(path).await).is_some()
    }

    /// Rewrite `input` under the given budgets
    ///
    /// Returns the generated text. When no model is loaded the input comes
    /// back unchanged: that fallback is part of the contract, the managed
    /// layer always receives a usable string. Other failures fall back to
    /// the input too, with detail left in [`last_error`](Self::last_error).
    pub async fn rewrite(
        &self,
        input: &str,
        max_tokens: i32,
        temperature: f32,
        max_time_ms: i32,
        threads: i32,
        context_size: i32,
    ) -> String {
        let params = RewriteParams {
            max_tokens,
            temperature,
            max_time_ms,
            threads,
            context_size,
        };
        self.rewrite_with(input, &params).await
    }

    /// Rewrite `input` with the bridge's default parameters
    pub async fn rewrite_default(&self, input: &str) -> String {
        let defaults = self.defaults.clone();
        self.rewrite_with(input, &defaults).await
    }

    /// Rewrite `input` with explicit parameters
    pub async fn rewrite_with(&self, input: &str, params: &RewriteParams) -> String {
        match self.record(self.session.rewrite(input, params).await) {
            Some(output) => output.text,
            None => input.to_string(),
        }
    }

    /// Tear the session down; always succeeds, safe when nothing is loaded
    pub async fn release(&self) {
        self.record(self.session.release().await);
    }

    /// Message of the most recent failed call; cleared when a later call
    /// succeeds
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Model status for the managed caller
    pub async fn model_info(&self) -> ModelStatus {
        match self.session.model_info().await {
            Some(info) => ModelStatus {
                loaded: true,
                path: self.session.model_path().await,
                size_mb: Some(info.size_mb),
            },
            None => ModelStatus {
                loaded: false,
                path: None,
                size_mb: None,
            },
        }
    }

    /// Current session state (diagnostics)
    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    /// Collapse a result to its success value, tracking the error slot
    fn record<T>(&self, result: Result<T>) -> Option<T> {
        let mut slot = self.last_error.lock().unwrap();
        match result {
            Ok(value) => {
                *slot = None;
                Some(value)
            }
            Err(err) => {
                tracing::debug!("Bridge call failed: {}", err);
                *slot = Some(err.to_string());
                None
            }
        }
    }
}
