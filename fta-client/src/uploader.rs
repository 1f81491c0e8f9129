//! Asset upload
//!
//! Sends the asset as a single multipart file (`files` field) to the
//! session-scoped upload endpoint. The server answers with a JSON array of
//! stored paths; the first one identifies our file.

use fta_common::SessionToken;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::asset::AssetDescriptor;
use crate::endpoints::ServiceEndpoints;
use crate::error::UploadError;

/// Server-side handle of an uploaded file
///
/// Only [`AssetUploader::upload`] can construct one. Serializes to the file
/// object expected inside a queue join payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerFileReference {
    #[serde(rename = "path")]
    server_path: String,
    #[serde(rename = "url")]
    public_url: String,
    #[serde(rename = "orig_name")]
    display_name: String,
    #[serde(rename = "size")]
    byte_size: u64,
    mime_type: String,
}

impl ServerFileReference {
    pub(crate) fn from_upload(
        server_path: String,
        endpoints: &ServiceEndpoints,
        asset: &AssetDescriptor,
        byte_size: u64,
    ) -> Self {
        Self {
            public_url: endpoints.file_url(&server_path),
            server_path,
            display_name: asset.display_name().to_string(),
            byte_size,
            mime_type: asset.mime_type().to_string(),
        }
    }

    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
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

/// Uploads local assets to the service
#[derive(Debug, Clone)]
pub struct AssetUploader {
    http_client: reqwest::Client,
    endpoints: ServiceEndpoints,
    request_timeout: Duration,
}

impl AssetUploader {
    pub fn new(http_client: reqwest::Client, endpoints: ServiceEndpoints, request_timeout: Duration) -> Self {
        Self {
            http_client,
            endpoints,
            request_timeout,
        }
    }

    /// Upload `asset` under `session`
    ///
    /// Not idempotent: every call stores a new file on the server.
    pub async fn upload(
        &self,
        asset: &AssetDescriptor,
        session: &SessionToken,
    ) -> Result<ServerFileReference, UploadError> {
        let bytes = asset.read_bytes().await?;
        let byte_size = bytes.len() as u64;

        let part = Part::bytes(bytes)
            .file_name(asset.display_name().to_string())
            .mime_str(asset.mime_type())
            .map_err(|e| UploadError::ParseError(format!("invalid mime type: {}", e)))?;
        let form = Form::new().part("files", part);

        debug!(
            session = %session,
            file = asset.display_name(),
            size = byte_size,
            mime = asset.mime_type(),
            "Uploading asset"
        );

        let response = self
            .http_client
            .post(self.endpoints.upload(session))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UploadError::ApiError(status.as_u16(), error_text));
        }

        let paths: Vec<String> = response
            .json()
            .await
            .map_err(|e| UploadError::ParseError(e.to_string()))?;

        let server_path = paths
            .into_iter()
            .next()
            .filter(|p| !p.is_empty())
            .ok_or(UploadError::EmptyResponse)?;

        info!(session = %session, server_path = %server_path, "File uploaded");

        Ok(ServerFileReference::from_upload(
            server_path,
            &self.endpoints,
            asset,
            byte_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_reference_wire_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("look.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();
        let asset = AssetDescriptor::from_path(&path).await.unwrap();

        let endpoints = ServiceEndpoints::new("https://api.example.com");
        let reference =
            ServerFileReference::from_upload("/tmp/gradio/x/look.jpg".to_string(), &endpoints, &asset, 6);

        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            json!({
                "path": "/tmp/gradio/x/look.jpg",
                "url": "https://api.example.com/file=/tmp/gradio/x/look.jpg",
                "orig_name": "look.jpg",
                "size": 6,
                "mime_type": "image/jpeg",
            })
        );
    }
}
