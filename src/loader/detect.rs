//! Model format and source detection

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, RewritrError};

/// Detected model container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelFormat {
    /// GGUF format (llama.cpp, the on-device default)
    Gguf,
    /// SafeTensors format (HuggingFace standard)
    SafeTensors,
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFormat::Gguf => write!(f, "GGUF"),
            ModelFormat::SafeTensors => write!(f, "SafeTensors"),
        }
    }
}

/// Resolved model source
#[derive(Debug, Clone)]
pub struct ModelSource {
    /// Path to the model weights
    pub weights_path: PathBuf,
    /// Path to a sibling config file, if one exists (SafeTensors only;
    /// GGUF carries its metadata inline)
    pub config_path: Option<PathBuf>,
    /// Detected format
    pub format: ModelFormat,
}

/// Resolve a path to a model source
///
/// The path can be a direct `.gguf` or `.safetensors` file, or a directory
/// holding one. GGUF wins when a directory contains both.
pub fn detect_model_source<P: AsRef<Path>>(path: P) -> Result<ModelSource> {
    let path = path.as_ref();

    if path.as_os_str().is_empty() {
        return Err(RewritrError::InvalidPath("empty model path".to_string()));
    }
    if !path.exists() {
        return Err(RewritrError::InvalidPath(format!(
            "{} does not exist",
            path.display()
        )));
    }

    if path.is_file() {
        source_from_file(path)
    } else if path.is_dir() {
        source_from_directory(path)
    } else {
        Err(RewritrError::InvalidPath(format!(
            "{} is not a regular file or directory",
            path.display()
        )))
    }
}

fn source_from_file(path: &Path) -> Result<ModelSource> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        "gguf" => Ok(ModelSource {
            weights_path: path.to_path_buf(),
            config_path: None,
            format: ModelFormat::Gguf,
        }),
        "safetensors" => Ok(ModelSource {
            weights_path: path.to_path_buf(),
            config_path: sibling_config(path),
            format: ModelFormat::SafeTensors,
        }),
        "" => Err(RewritrError::UnsupportedFormat(format!(
            "{} has no recognized model extension",
            path.display()
        ))),
        other => Err(RewritrError::UnsupportedFormat(format!(
            "unsupported model file extension .{other}"
        ))),
    }
}

fn source_from_directory(dir: &Path) -> Result<ModelSource> {
    if let Some(gguf) = first_glob(dir, "*.gguf") {
        return Ok(ModelSource {
            weights_path: gguf,
            config_path: None,
            format: ModelFormat::Gguf,
        });
    }

    let preferred = dir.join("model.safetensors");
    if preferred.exists() {
        return Ok(ModelSource {
            weights_path: preferred,
            config_path: find_config_in_dir(dir),
            format: ModelFormat::SafeTensors,
        });
    }

    if let Some(safetensors) = first_glob(dir, "*.safetensors") {
        return Ok(ModelSource {
            weights_path: safetensors,
            config_path: find_config_in_dir(dir),
            format: ModelFormat::SafeTensors,
        });
    }

    Err(RewritrError::UnsupportedFormat(format!(
        "no model files found in directory: {}",
        dir.display()
    )))
}

/// Find a config file in a directory
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join("config.json");
    candidate.exists().then_some(candidate)
}

/// Find a config file next to a weights file
fn sibling_config(file: &Path) -> Option<PathBuf> {
    file.parent().and_then(find_config_in_dir)
}

/// First file matching a glob pattern inside a directory
fn first_glob(dir: &Path, pattern: &str) -> Option<PathBuf> {
    let full_pattern = dir.join(pattern);
    glob::glob(full_pattern.to_str()?)
        .ok()?
        .filter_map(|r| r.ok())
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_path_is_invalid() {
        let err = detect_model_source("").unwrap_err();
        assert!(matches!(err, RewritrError::InvalidPath(_)));
    }

    #[test]
    fn test_missing_path_is_invalid() {
        let err = detect_model_source("/no/such/model.gguf").unwrap_err();
        assert!(matches!(err, RewritrError::InvalidPath(_)));
    }

    #[test]
    fn test_gguf_file_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_model.gguf");
        std::fs::write(&path, b"x").unwrap();

        let source = detect_model_source(&path).unwrap();
        assert_eq!(source.format, ModelFormat::Gguf);
        assert_eq!(source.weights_path, path);
        assert!(source.config_path.is_none());
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"x").unwrap();

        let err = detect_model_source(&path).unwrap_err();
        assert!(matches!(err, RewritrError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_directory_prefers_gguf() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("model.safetensors"), b"x").unwrap();
        std::fs::write(dir.path().join("model.gguf"), b"x").unwrap();

        let source = detect_model_source(dir.path()).unwrap();
        assert_eq!(source.format, ModelFormat::Gguf);
    }

    #[test]
    fn test_directory_safetensors_picks_up_config() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("model.safetensors"), b"x").unwrap();
        std::fs::write(dir.path().join("config.json"), b"{}").unwrap();

        let source = detect_model_source(dir.path()).unwrap();
        assert_eq!(source.format, ModelFormat::SafeTensors);
        assert!(source.config_path.is_some());
    }

    #[test]
    fn test_empty_directory_is_unsupported() {
        let dir = tempdir().unwrap();
        let err = detect_model_source(dir.path()).unwrap_err();
        assert!(matches!(err, RewritrError::UnsupportedFormat(_)));
    }
}
