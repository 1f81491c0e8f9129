//! Service URL conventions
//!
//! All endpoints hang off one configured base URL:
//! - `POST /upload?upload_id={session}`
//! - `POST /queue/join`
//! - `GET  /queue/data?session_hash={session}`
//! - `GET  /file={server_path}` (public retrieval of uploaded or generated files)

use fta_common::SessionToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    base: String,
}

impl ServiceEndpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn upload(&self, session: &SessionToken) -> String {
        format!("{}/upload?upload_id={}", self.base, session)
    }

    pub fn queue_join(&self) -> String {
        format!("{}/queue/join", self.base)
    }

    pub fn queue_data(&self, session: &SessionToken) -> String {
        format!("{}/queue/data?session_hash={}", self.base, session)
    }

    /// Public URL of a file the server stored at `server_path`
    pub fn file_url(&self, server_path: &str) -> String {
        format!("{}/file={}", self.base, server_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_ignored() {
        let endpoints = ServiceEndpoints::new("https://api.example.com/");
        assert_eq!(endpoints.base_url(), "https://api.example.com");
        assert_eq!(endpoints.queue_join(), "https://api.example.com/queue/join");
    }

    #[test]
    fn test_session_scoped_urls() {
        let endpoints = ServiceEndpoints::new("http://localhost:7860");
        let session = SessionToken::generate();

        assert_eq!(
            endpoints.upload(&session),
            format!("http://localhost:7860/upload?upload_id={}", session)
        );

        assert_eq!(
            endpoints.queue_data(&session),
            format!("http://localhost:7860/queue/data?session_hash={}", session)
        );
    }

    #[test]
    fn test_file_url_convention() {
        let endpoints = ServiceEndpoints::new("https://api.example.com");
        assert_eq!(
            endpoints.file_url("/tmp/gradio/abc/look.jpg"),
            "https://api.example.com/file=/tmp/gradio/abc/look.jpg"
        );
    }
}
