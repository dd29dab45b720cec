//! GGUF container inspection
//!
//! Reads the GGUF header and metadata table without touching tensor data:
//! enough to reject non-models early and surface model facts (architecture,
//! context length) before the engine is asked to allocate anything.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, RewritrError};

const GGUF_MAGIC: [u8; 4] = *b"GGUF";

/// Header versions this reader accepts
const SUPPORTED_VERSIONS: &[u32] = &[2, 3];

// Sanity bounds; a header exceeding these is treated as corrupt.
const MAX_TENSOR_COUNT: u64 = 1 << 24;
const MAX_METADATA_ENTRIES: u64 = 1 << 20;
const MAX_STRING_LEN: u64 = 1 << 26;
const MAX_ARRAY_LEN: u64 = 1 << 28;
const MAX_ARRAY_DEPTH: u32 = 4;

/// Information about a GGUF file
#[derive(Debug, Clone)]
pub struct GgufInfo {
    pub version: u32,
    pub architecture: Option<String>,
    pub model_name: Option<String>,
    pub context_length: Option<u64>,
    pub embedding_length: Option<u64>,
    pub block_count: Option<u64>,
    pub tensor_count: u64,
    pub metadata_entries: u64,
    pub file_size_bytes: u64,
}

/// Scalar metadata values the reader keeps; arrays are skipped over.
#[derive(Debug, Clone, PartialEq)]
enum MetaValue {
    Uint(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Read GGUF header metadata without loading tensor data
pub fn read_gguf_info<P: AsRef<Path>>(path: P) -> Result<GgufInfo> {
    let path = path.as_ref();

    let file = File::open(path)
        .map_err(|e| RewritrError::InvalidPath(format!("{}: {}", path.display(), e)))?;
    let file_size_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| bad_container(path, "file too short for a GGUF header"))?;
    if magic != GGUF_MAGIC {
        return Err(bad_container(path, "missing GGUF magic"));
    }

    let version = read_u32(&mut reader, path)?;
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(bad_container(
            path,
            &format!("unsupported GGUF version {version}"),
        ));
    }

    let tensor_count = read_u64(&mut reader, path)?;
    if tensor_count > MAX_TENSOR_COUNT {
        return Err(bad_container(path, "implausible tensor count"));
    }

    let metadata_entries = read_u64(&mut reader, path)?;
    if metadata_entries > MAX_METADATA_ENTRIES {
        return Err(bad_container(path, "implausible metadata entry count"));
    }

    let mut metadata: HashMap<String, MetaValue> = HashMap::new();
    for _ in 0..metadata_entries {
        let key = read_string(&mut reader, path)?;
        let value_type = read_u32(&mut reader, path)?;
        if let Some(value) = read_value(&mut reader, path, value_type)? {
            metadata.insert(key, value);
        }
    }

    let architecture = get_str(&metadata, "general.architecture");
    let model_name = get_str(&metadata, "general.name");

    // Per-architecture keys, e.g. "llama.context_length"
    let arch_uint = |suffix: &str| {
        architecture
            .as_deref()
            .and_then(|arch| get_uint(&metadata, &format!("{arch}.{suffix}")))
    };

    Ok(GgufInfo {
        version,
        context_length: arch_uint("context_length"),
        embedding_length: arch_uint("embedding_length"),
        block_count: arch_uint("block_count"),
        architecture,
        model_name,
        tensor_count,
        metadata_entries,
        file_size_bytes,
    })
}

fn bad_container(path: &Path, why: &str) -> RewritrError {
    RewritrError::UnsupportedFormat(format!("{}: {}", path.display(), why))
}

fn read_bytes<const N: usize>(reader: &mut impl Read, path: &Path) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|_| bad_container(path, "truncated metadata"))?;
    Ok(buf)
}

fn read_u32(reader: &mut impl Read, path: &Path) -> Result<u32> {
    Ok(u32::from_le_bytes(read_bytes::<4>(reader, path)?))
}

fn read_u64(reader: &mut impl Read, path: &Path) -> Result<u64> {
    Ok(u64::from_le_bytes(read_bytes::<8>(reader, path)?))
}

fn read_string(reader: &mut impl Read, path: &Path) -> Result<String> {
    let len = read_u64(reader, path)?;
    if len > MAX_STRING_LEN {
        return Err(bad_container(path, "implausible metadata string length"));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .map_err(|_| bad_container(path, "truncated metadata"))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_value(reader: &mut impl Read, path: &Path, value_type: u32) -> Result<Option<MetaValue>> {
    let value = match value_type {
        0 => MetaValue::Uint(read_bytes::<1>(reader, path)?[0] as u64),
        1 => MetaValue::Int(i8::from_le_bytes(read_bytes::<1>(reader, path)?) as i64),
        2 => MetaValue::Uint(u16::from_le_bytes(read_bytes::<2>(reader, path)?) as u64),
        3 => MetaValue::Int(i16::from_le_bytes(read_bytes::<2>(reader, path)?) as i64),
        4 => MetaValue::Uint(read_u32(reader, path)? as u64),
        5 => MetaValue::Int(i32::from_le_bytes(read_bytes::<4>(reader, path)?) as i64),
        6 => MetaValue::Float(f32::from_le_bytes(read_bytes::<4>(reader, path)?) as f64),
        7 => MetaValue::Bool(read_bytes::<1>(reader, path)?[0] != 0),
        8 => MetaValue::Str(read_string(reader, path)?),
        9 => {
            // Arrays (token tables, merge lists) are not needed here
            skip_array(reader, path, 0)?;
            return Ok(None);
        }
        10 => MetaValue::Uint(read_u64(reader, path)?),
        11 => MetaValue::Int(i64::from_le_bytes(read_bytes::<8>(reader, path)?)),
        12 => MetaValue::Float(f64::from_le_bytes(read_bytes::<8>(reader, path)?)),
        other => {
            return Err(bad_container(
                path,
                &format!("unknown metadata value type {other}"),
            ))
        }
    };
    Ok(Some(value))
}

fn skip_array(reader: &mut impl Read, path: &Path, depth: u32) -> Result<()> {
    if depth > MAX_ARRAY_DEPTH {
        return Err(bad_container(path, "metadata arrays nested too deeply"));
    }

    let elem_type = read_u32(reader, path)?;
    let count = read_u64(reader, path)?;
    if count > MAX_ARRAY_LEN {
        return Err(bad_container(path, "implausible metadata array length"));
    }

    match elem_type {
        8 => {
            for _ in 0..count {
                let len = read_u64(reader, path)?;
                if len > MAX_STRING_LEN {
                    return Err(bad_container(path, "implausible metadata string length"));
                }
                skip_bytes(reader, len, path)?;
            }
        }
        9 => {
            for _ in 0..count {
                skip_array(reader, path, depth + 1)?;
            }
        }
        other => {
            let size = scalar_size(other)
                .ok_or_else(|| bad_container(path, &format!("unknown array element type {other}")))?;
            skip_bytes(reader, count.saturating_mul(size), path)?;
        }
    }
    Ok(())
}

fn scalar_size(value_type: u32) -> Option<u64> {
    match value_type {
        0 | 1 | 7 => Some(1),
        2 | 3 => Some(2),
        4 | 5 | 6 => Some(4),
        10 | 11 | 12 => Some(8),
        _ => None,
    }
}

fn skip_bytes(reader: &mut impl Read, n: u64, path: &Path) -> Result<()> {
    let copied = std::io::copy(&mut reader.by_ref().take(n), &mut std::io::sink())
        .map_err(|_| bad_container(path, "truncated metadata"))?;
    if copied != n {
        return Err(bad_container(path, "truncated metadata"));
    }
    Ok(())
}

fn get_str(metadata: &HashMap<String, MetaValue>, key: &str) -> Option<String> {
    match metadata.get(key) {
        Some(MetaValue::Str(s)) => Some(s.clone()),
        _ => None,
    }
}

fn get_uint(metadata: &HashMap<String, MetaValue>, key: &str) -> Option<u64> {
    match metadata.get(key) {
        Some(MetaValue::Uint(v)) => Some(*v),
        Some(MetaValue::Int(v)) if *v >= 0 => Some(*v as u64),
        _ => None,
    }
}
