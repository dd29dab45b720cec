//! Core inference engine
//!
//! This module provides the inference session pipeline:
//! - Session: owns the model lifecycle and call sequencing
//! - Executor: runs one bounded rewrite against a loaded model

mod executor;
mod session;

pub use executor::{CancelFlag, Executor, RewriteOutput, StopReason};
pub use session::{Session, SessionState};
