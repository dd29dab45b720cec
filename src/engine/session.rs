//! Inference session lifecycle
//!
//! A session owns at most one loaded model and sequences every
//! state-affecting call against it: load, rewrite, release. Legality of
//! each call is decided by an explicit state machine, not ad hoc flags.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task;

use crate::backend::InferenceBackend;
use crate::config::RewriteParams;
use crate::engine::executor::{CancelFlag, Executor, RewriteOutput};
use crate::error::{Result, RewritrError};
use crate::model::{ModelHandle, ModelInfo};

/// Lifecycle states of an inference session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Initialized, no model loaded
    Idle,
    /// A model load is in flight
    Loading,
    /// A model is loaded and available for requests
    Ready,
    /// A rewrite is in flight
    Generating,
    /// Teardown in progress
    Releasing,
}

struct SessionInner {
    state: SessionState,
    model: Option<ModelHandle>,
    /// Cancel flag of the in-flight generation, if any
    active: Option<CancelFlag>,
}

/// Stateful owner of at most one model handle
///
/// One mutex serializes all state transitions. The blocking engine work
/// (container load, generation loop) runs on a `spawn_blocking` worker with
/// the lock released, so a concurrent `release` can observe
/// `Loading`/`Generating` and act on it; everything else holds the lock for
/// the duration of the call.
pub struct Session {
    inner: Mutex<SessionInner>,
    /// Bumped whenever a load or generation settles, so `release` can wait
    /// for in-flight work without holding the lock
    settled: watch::Sender<u64>,
    backend: Arc<dyn InferenceBackend>,
}

impl Session {
    /// Create a session in the `Uninitialized` state
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        let (settled, _) = watch::channel(0u64);
        Self {
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                model: None,
                active: None,
            }),
            settled,
            backend,
        }
    }

    /// `Uninitialized -> Idle`; a no-op success when already initialized
    pub async fn init(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Uninitialized {
            inner.state = SessionState::Idle;
            tracing::info!("Session initialized ({})", self.backend.name());
        }
        Ok(())
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Metadata of the loaded model, if any
    pub async fn model_info(&self) -> Option<ModelInfo> {
        let inner = self.inner.lock().await;
        inner.model.as_ref().map(|m| m.info().clone())
    }

    /// Path of the loaded model, if any
    pub async fn model_path(&self) -> Option<std::path::PathBuf> {
        let inner = self.inner.lock().await;
        inner.model.as_ref().map(|m| m.source_path().to_path_buf())
    }

    /// Load a model container, replacing any previously loaded model
    ///
    /// `Idle|Ready -> Loading -> Ready` on success, `-> Idle` on failure.
    /// An already-loaded model is released before the new load begins, so
    /// two models are never alive at once; after a failed load no model is
    /// held at all.
    pub async fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<ModelInfo> {
        let path = path.as_ref().to_path_buf();

        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Idle | SessionState::Ready => {}
                SessionState::Uninitialized => return Err(RewritrError::NotInitialized),
                SessionState::Loading => return Err(RewritrError::SessionBusy("load")),
                SessionState::Generating => return Err(RewritrError::SessionBusy("generation")),
                SessionState::Releasing => return Err(RewritrError::SessionBusy("release")),
            }
            inner.state = SessionState::Loading;
            // The old model goes away before the new load starts
            if let Some(mut old) = inner.model.take() {
                old.release();
            }
        }

        let backend = Arc::clone(&self.backend);
        let load_path = path.clone();
        let loaded = match task::spawn_blocking(move || {
            ModelHandle::load(backend.as_ref(), &load_path)
        })
        .await
        {
            Ok(result) => result,
            Err(join_err) => Err(RewritrError::InferenceFault(format!(
                "load worker failed: {join_err}"
            ))),
        };

        let result = {
            let mut inner = self.inner.lock().await;
            match loaded {
                Ok(handle) => {
                    let info = handle.info().clone();
                    tracing::info!("Model ready: {}", path.display());
                    inner.model = Some(handle);
                    inner.state = SessionState::Ready;
                    Ok(info)
                }
                Err(err) => {
                    tracing::warn!("Model load failed: {}", err);
                    inner.state = SessionState::Idle;
                    Err(err)
                }
            }
        };
        self.notify_settled();
        result
    }

    /// Run one bounded rewrite against the loaded model
    ///
    /// Legal only from `Ready` (`Ready -> Generating -> Ready`); the
    /// generation loop runs on a blocking worker with the session lock
    /// released so `release` can cancel it mid-flight.
    pub async fn rewrite(&self, input: &str, params: &RewriteParams) -> Result<RewriteOutput> {
        let (model, cancel) = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Ready => {}
                SessionState::Generating => return Err(RewritrError::SessionBusy("generation")),
                SessionState::Loading => return Err(RewritrError::SessionBusy("load")),
                SessionState::Releasing => return Err(RewritrError::SessionBusy("release")),
                SessionState::Idle | SessionState::Uninitialized => {
                    return Err(RewritrError::ModelNotLoaded)
                }
            }
            let model = inner
                .model
                .as_ref()
                .ok_or(RewritrError::ModelNotLoaded)?
                .resources()?;
            let cancel = CancelFlag::new();
            inner.active = Some(cancel.clone());
            inner.state = SessionState::Generating;
            (model, cancel)
        };

        let executor = Executor::new(model);
        let input = input.to_string();
        let request = params.clone();
        let exec_cancel = cancel.clone();
        let result = match task::spawn_blocking(move || {
            executor.execute(&input, &request, &exec_cancel)
        })
        .await
        {
            Ok(result) => result,
            Err(join_err) => Err(RewritrError::InferenceFault(format!(
                "generation worker failed: {join_err}"
            ))),
        };

        {
            let mut inner = self.inner.lock().await;
            inner.active = None;
            if inner.state == SessionState::Generating {
                inner.state = if inner.model.is_some() {
                    SessionState::Ready
                } else {
                    SessionState::Idle
                };
            }
        }
        self.notify_settled();

        // A generation that raced to completion just as release() set the
        // flag still counts as cancelled: release always wins.
        if cancel.is_set() && result.is_ok() {
            return Err(RewritrError::Cancelled);
        }
        result
    }

    /// Request cancellation of the in-flight generation, if any
    ///
    /// Unlike `release` this keeps the model loaded; the affected rewrite
    /// call reports `Cancelled`. Returns whether a generation was in flight.
    pub async fn cancel(&self) -> bool {
        let inner = self.inner.lock().await;
        if inner.state == SessionState::Generating {
            if let Some(active) = &inner.active {
                active.set();
                tracing::info!("Generation cancel requested");
                return true;
            }
        }
        false
    }

    /// Tear down: `any state -> Releasing -> Idle`
    ///
    /// Cancels an in-flight generation and waits for the executor to
    /// acknowledge the stop before freeing the model handle; the handle is
    /// never freed under a running generation. Idempotent from `Idle`.
    pub async fn release(&self) -> Result<()> {
        let mut rx = self.settled.subscribe();
        let mut inner = self.inner.lock().await;
        loop {
            match inner.state {
                SessionState::Generating => {
                    if let Some(active) = inner.active.clone() {
                        active.set();
                    }
                    drop(inner);
                    let _ = rx.changed().await;
                    inner = self.inner.lock().await;
                }
                SessionState::Loading => {
                    drop(inner);
                    let _ = rx.changed().await;
                    inner = self.inner.lock().await;
                }
                _ => break,
            }
        }

        inner.state = SessionState::Releasing;
        if let Some(mut handle) = inner.model.take() {
            handle.release();
        }
        inner.state = SessionState::Idle;
        Ok(())
    }

    fn notify_settled(&self) {
        self.settled.send_modify(|v| *v += 1);
    }
}
