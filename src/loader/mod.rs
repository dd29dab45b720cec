//! Model container utilities
//!
//! Detects and validates model containers before any engine resources are
//! allocated:
//! - GGUF (llama.cpp format, the on-device default)
//! - SafeTensors (HuggingFace standard)
//!
//! Detection and validation failures map to `InvalidPath` and
//! `UnsupportedFormat`; the engine backend is only handed sources that
//! passed these checks.

mod detect;
mod gguf;
mod safetensors;

pub use detect::{detect_model_source, ModelFormat, ModelSource};
pub use gguf::{read_gguf_info, GgufInfo};
pub use safetensors::{read_safetensors_info, SafetensorsInfo};

use std::path::Path;

use crate::error::Result;

/// Validated facts about a model container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub format: ModelFormat,
    pub file_size_bytes: u64,
    pub architecture: Option<String>,
    pub model_name: Option<String>,
    pub context_length: Option<u64>,
    pub tensor_count: u64,
}

/// Detect and validate a model container in one step
pub fn inspect<P: AsRef<Path>>(path: P) -> Result<ContainerInfo> {
    let source = detect_model_source(path)?;
    inspect_source(&source)
}

/// Validate an already-detected model source
pub fn inspect_source(source: &ModelSource) -> Result<ContainerInfo> {
    match source.format {
        ModelFormat::Gguf => {
            let info = read_gguf_info(&source.weights_path)?;
            Ok(ContainerInfo {
                format: ModelFormat::Gguf,
                file_size_bytes: info.file_size_bytes,
                architecture: info.architecture,
                model_name: info.model_name,
                context_length: info.context_length,
                tensor_count: info.tensor_count,
            })
        }
        ModelFormat::SafeTensors => {
            let info = read_safetensors_info(&source.weights_path)?;
            let (architecture, context_length) = source
                .config_path
                .as_deref()
                .map(read_hf_config)
                .unwrap_or((None, None));
            Ok(ContainerInfo {
                format: ModelFormat::SafeTensors,
                file_size_bytes: info.file_size_bytes,
                architecture,
                model_name: None,
                context_length,
                tensor_count: info.tensor_count as u64,
            })
        }
    }
}

/// Pull architecture facts out of a sibling HuggingFace config.json
fn read_hf_config(path: &Path) -> (Option<String>, Option<u64>) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return (None, None);
    };
    let Ok(config) = serde_json::from_str::<serde_json::Value>(&content) else {
        return (None, None);
    };
    let architecture = config
        .get("model_type")
        .and_then(|v| v.as_str())
        .map(String::from);
    let context_length = config
        .get("max_position_embeddings")
        .and_then(|v| v.as_u64());
    (architecture, context_length)
}
