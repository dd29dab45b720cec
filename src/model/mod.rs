//! Loaded model handle
//!
//! A `ModelHandle` pairs one loaded model's engine resources with the path
//! and container facts it came from. Handles are created only by a fully
//! successful load and are owned exclusively by the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::backend::{EngineModel, InferenceBackend};
use crate::error::{Result, RewritrError};
use crate::loader::{self, ModelFormat};

/// Metadata about a loaded model, surfaced to the managed caller
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub format: ModelFormat,
    pub size_mb: u64,
    pub architecture: Option<String>,
    pub context_length: Option<u64>,
}

/// Owned native resources of one loaded model
pub struct ModelHandle {
    source_path: PathBuf,
    info: ModelInfo,
    resources: Option<Arc<dyn EngineModel>>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source_path", &self.source_path)
            .field("info", &self.info)
            .field("resources", &self.resources.is_some())
            .finish()
    }
}

impl ModelHandle {
    /// Load a model container through `backend`
    ///
    /// The container is detected and validated before the engine is asked
    /// to allocate anything; on failure no handle exists and whatever the
    /// backend allocated has been dropped.
    pub(crate) fn load(backend: &dyn InferenceBackend, path: &Path) -> Result<Self> {
        let source = loader::detect_model_source(path)?;
        let container = loader::inspect_source(&source)?;

        tracing::info!(
            "Loading model ({}, {}): {}",
            container.format,
            backend.name(),
            source.weights_path.display()
        );
        let resources = backend.open(&source)?;

        let info = ModelInfo {
            format: container.format,
            size_mb: container.file_size_bytes / (1024 * 1024),
            architecture: container.architecture,
            context_length: container.context_length,
        };

        Ok(Self {
            source_path: source.weights_path,
            info,
            resources: Some(resources),
        })
    }

    /// Path the model was loaded from
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Container facts captured at load time
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Whether `release` has already run
    pub fn is_released(&self) -> bool {
        self.resources.is_none()
    }

    /// Clone of the engine resources for one request's duration
    ///
    /// The executor must not hold this beyond the request; the session
    /// waits for the executor to finish before freeing the handle.
    pub(crate) fn resources(&self) -> Result<Arc<dyn EngineModel>> {
        self.resources.clone().ok_or(RewritrError::ModelNotLoaded)
    }

    /// Free the engine resources
    ///
    /// Idempotent: releasing an already-released handle is a no-op. The
    /// drop here is the final one, so the engine's native memory is freed
    /// synchronously before this returns.
    pub fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            drop(resources);
            tracing::info!("Model released: {}", self.source_path.display());
        }
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        self.release();
    }
}
