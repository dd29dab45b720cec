//! Model info command

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::loader::{detect_model_source, read_gguf_info, read_safetensors_info, ModelFormat};

/// Show model container information
pub async fn info(model: String) -> Result<()> {
    let model_path = find_model_path(&model)?;

    println!("Model: {}\n", model);
    println!("Path: {}", model_path.display());

    let source = detect_model_source(&model_path)?;

    match source.format {
        ModelFormat::Gguf => print_gguf_info(&source.weights_path)?,
        ModelFormat::SafeTensors => print_safetensors_info(&source)?,
    }

    Ok(())
}

fn find_model_path(model: &str) -> Result<PathBuf> {
    // Try direct path
    let direct = PathBuf::from(model);
    if direct.exists() {
        return Ok(direct);
    }

    // Try in model directory
    let model_dir = std::env::var("REWRITR_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./models"));

    let in_dir = model_dir.join(model);
    if in_dir.exists() {
        return Ok(in_dir);
    }

    Err(anyhow!("Model not found: {}", model))
}

fn print_gguf_info(path: &std::path::Path) -> Result<()> {
    println!("Format: GGUF\n");

    let info = read_gguf_info(path)?;

    println!("Header version: {}", info.version);
    if let Some(architecture) = &info.architecture {
        println!("Architecture: {}", architecture);
    }
    if let Some(name) = &info.model_name {
        println!("Name: {}", name);
    }
    if let Some(context_length) = info.context_length {
        println!("Max context: {}", context_length);
    }
    if let Some(embedding_length) = info.embedding_length {
        println!("Hidden size: {}", embedding_length);
    }
    if let Some(block_count) = info.block_count {
        println!("Layers: {}", block_count);
    }
    println!("Tensors: {}", info.tensor_count);
    println!("Metadata entries: {}", info.metadata_entries);
    print_file_size(info.file_size_bytes);

    Ok(())
}

fn print_safetensors_info(source: &crate::loader::ModelSource) -> Result<()> {
    println!("Format: SafeTensors\n");

    let info = read_safetensors_info(&source.weights_path)?;

    if let Some(config_path) = &source.config_path {
        let content = std::fs::read_to_string(config_path)?;
        let config: serde_json::Value = serde_json::from_str(&content)?;

        if let Some(model_type) = config.get("model_type").and_then(|v| v.as_str()) {
            println!("Architecture: {}", model_type);
        }
        if let Some(max_pos) = config
            .get("max_position_embeddings")
            .and_then(|v| v.as_u64())
        {
            println!("Max context: {}", max_pos);
        }
    }

    println!("Tensors: {}", info.tensor_count);
    print_file_size(info.file_size_bytes);

    Ok(())
}

fn print_file_size(bytes: u64) {
    let size_gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    if size_gb >= 1.0 {
        println!("File size: {:.2} GB", size_gb);
    } else {
        let size_mb = bytes as f64 / (1024.0 * 1024.0);
        println!("File size: {:.2} MB", size_mb);
    }
}
