//! SafeTensors container inspection
//!
//! Validates the length-prefixed JSON header without mapping tensor data.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, RewritrError};

/// Largest JSON header accepted, per the format's own limit
const MAX_HEADER_LEN: u64 = 100 * 1024 * 1024;

/// Information about a SafeTensors file
#[derive(Debug, Clone)]
pub struct SafetensorsInfo {
    pub tensor_count: usize,
    pub header_bytes: u64,
    pub file_size_bytes: u64,
}

/// Validate a SafeTensors header and count its tensors
pub fn read_safetensors_info<P: AsRef<Path>>(path: P) -> Result<SafetensorsInfo> {
    let path = path.as_ref();

    let mut file = File::open(path)
        .map_err(|e| RewritrError::InvalidPath(format!("{}: {}", path.display(), e)))?;
    let file_size_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)
        .map_err(|_| bad_container(path, "file too short for a SafeTensors header"))?;
    let header_bytes = u64::from_le_bytes(len_bytes);

    if header_bytes > MAX_HEADER_LEN {
        return Err(bad_container(path, "implausible header length"));
    }
    if header_bytes.saturating_add(8) > file_size_bytes {
        return Err(bad_container(path, "header length exceeds file size"));
    }

    let mut header = vec![0u8; header_bytes as usize];
    file.read_exact(&mut header)
        .map_err(|_| bad_container(path, "truncated header"))?;

    let parsed: serde_json::Value = serde_json::from_slice(&header)
        .map_err(|_| bad_container(path, "header is not valid JSON"))?;
    let entries = parsed
        .as_object()
        .ok_or_else(|| bad_container(path, "header is not a JSON object"))?;

    let mut tensor_count = 0usize;
    for (name, entry) in entries {
        if name == "__metadata__" {
            continue;
        }
        let is_tensor = entry
            .as_object()
            .map(|o| o.contains_key("dtype") && o.contains_key("shape"))
            .unwrap_or(false);
        if !is_tensor {
            return Err(bad_container(
                path,
                &format!("header entry '{name}' is not a tensor descriptor"),
            ));
        }
        tensor_count += 1;
    }

    Ok(SafetensorsInfo {
        tensor_count,
        header_bytes,
        file_size_bytes,
    })
}

fn bad_container(path: &Path, why: &str) -> RewritrError {
    RewritrError::UnsupportedFormat(format!("{}: {}", path.display(), why))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(header: &[u8], payload: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(payload);
        std::fs::write(file.path(), &bytes).unwrap();
        file
    }

    #[test]
    fn test_valid_header() {
        let header =
            br#"{"__metadata__":{},"wte":{"dtype":"F32","shape":[2,2],"data_offsets":[0,16]}}"#;
        let file = write_temp(header, &[0u8; 16]);

        let info = read_safetensors_info(file.path()).unwrap();
        assert_eq!(info.tensor_count, 1);
        assert_eq!(info.header_bytes, header.len() as u64);
    }

    #[test]
    fn test_header_longer_than_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), 4096u64.to_le_bytes()).unwrap();

        let err = read_safetensors_info(file.path()).unwrap_err();
        assert!(matches!(err, RewritrError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_non_json_header() {
        let file = write_temp(b"not json at all", &[]);
        let err = read_safetensors_info(file.path()).unwrap_err();
        assert!(matches!(err, RewritrError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_non_tensor_entry() {
        let header = br#"{"wte":"oops"}"#;
        let file = write_temp(header, &[]);
        let err = read_safetensors_info(file.path()).unwrap_err();
        assert!(matches!(err, RewritrError::UnsupportedFormat(_)));
    }
}
