//! Local asset description
//!
//! Size and content type are read from the file itself. Content type is
//! sniffed from the leading bytes; unknown formats fall back to
//! `application/octet-stream`.

use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::error::UploadError;

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Bytes needed by the sniffer to recognise common image formats
const SNIFF_LEN: usize = 8192;

/// Read-only description of the caller's local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    local_path: PathBuf,
    display_name: String,
    byte_size: u64,
    mime_type: String,
}

impl AssetDescriptor {
    /// Describe the file at `path`
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let unreadable = |source: std::io::Error| UploadError::AssetUnreadable {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(unreadable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let mut head = Vec::with_capacity(SNIFF_LEN);
        tokio::fs::File::open(path)
            .await
            .map_err(unreadable)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .map_err(unreadable)?;

        let mime_type = infer::get(&head)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            local_path: path.to_path_buf(),
            display_name,
            byte_size: metadata.len(),
            mime_type,
        })
    }

    /// Read the whole asset into memory
    pub async fn read_bytes(&self) -> Result<Vec<u8>, UploadError> {
        tokio::fs::read(&self.local_path)
            .await
            .map_err(|source| UploadError::AssetUnreadable {
                path: self.local_path.clone(),
                source,
            })
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}
