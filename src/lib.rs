//! Rewritr - native inference sessions for on-device text rewriting
//!
//! Rewritr is the stateful core behind a local-assistant rewrite feature:
//! a managed caller initializes a session, loads a model container into it,
//! runs bounded rewrite requests, and tears it down deterministically.
//!
//! # Architecture
//!
//! - **loader**: container detection and validation (GGUF, SafeTensors)
//! - **backend**: trait seam for the actual inference engine
//! - **engine**: the session state machine and the bounded request executor
//! - **bridge**: the managed-caller adapter (bool/String surface)
//!
//! The tensor math itself lives behind [`backend::InferenceBackend`]; this
//! crate owns lifecycle, sequencing, budgets, and cancellation.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo(backend: std::sync::Arc<dyn rewritr::backend::InferenceBackend>) -> rewritr::Result<()> {
//! use rewritr::{RewriteParams, Session};
//!
//! let session = Session::new(backend);
//! session.init().await?;
//! session.load_model("./models/local_model.gguf").await?;
//! let output = session.rewrite("make this clearer", &RewriteParams::default()).await?;
//! println!("{}", output.text);
//! session.release().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;

// Re-export key types
pub use bridge::{ModelStatus, RewriteBridge};
pub use config::{RewriteParams, RewritrConfig};
pub use engine::{RewriteOutput, Session, SessionState, StopReason};
pub use error::{Result, RewritrError};
pub use loader::{detect_model_source, inspect, ContainerInfo, ModelFormat, ModelSource};
pub use model::{ModelHandle, ModelInfo};
