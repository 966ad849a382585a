use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use ureq::Agent;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid document name {0:?}")]
    InvalidName(String),
}

/// Supplies the raw bytes of a cited document.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, document_name: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `<base_url>/<document name>` from blob storage over HTTP.
pub struct BlobStore {
    agent: Agent,
    base_url: String,
    max_bytes: u64,
}

impl BlobStore {
    pub fn new(base_url: &str, timeout: Duration, max_bytes: u64) -> Self {
        let config = Agent::config_builder().timeout_global(Some(timeout)).build();
        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn url_for(&self, document_name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(document_name))
    }
}

impl DocumentFetcher for BlobStore {
    fn fetch(&self, document_name: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(document_name);

        let resp = match self.agent.get(&url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status)) => return Err(FetchError::Status { url, status }),
            Err(e) => return Err(FetchError::Transport { url, message: e.to_string() }),
        };
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status { url, status });
        }

        let body = resp.into_body().with_config().limit(self.max_bytes).read_to_vec();
        let bytes = match body {
            Ok(bytes) => bytes,
            Err(e) => return Err(FetchError::Transport { url, message: e.to_string() }),
        };
        tracing::debug!(%url, bytes = bytes.len(), "fetched document");
        Ok(bytes)
    }
}

/// Reads documents from a local directory. Names may not leave the directory.
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DocumentFetcher for LocalDir {
    fn fetch(&self, document_name: &str) -> Result<Vec<u8>, FetchError> {
        let escapes = document_name
            .split(['/', '\\'])
            .any(|part| part == ".." || part.is_empty());
        if escapes {
            return Err(FetchError::InvalidName(document_name.to_string()));
        }
        let path = self.root.join(document_name);
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_url_encodes_name_and_trims_slash() {
        let store = BlobStore::new("https://blobs.example.com/pdf-chunks/", Duration::from_secs(1), 1024);
        assert_eq!(
            store.url_for("hr handbook.pdf"),
            "https://blobs.example.com/pdf-chunks/hr%20handbook.pdf"
        );
    }

    #[test]
    fn local_dir_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"%PDF-1.7").unwrap();

        let bytes = LocalDir::new(dir.path()).fetch("doc.pdf").unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[test]
    fn local_dir_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalDir::new(dir.path()).fetch("no-such-file.pdf");
        assert!(matches!(err, Err(FetchError::Io { .. })));
    }

    #[test]
    fn local_dir_rejects_escaping_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = LocalDir::new(tmp.path());
        assert!(matches!(dir.fetch("../etc/passwd.pdf"), Err(FetchError::InvalidName(_))));
        assert!(matches!(dir.fetch("/etc/passwd.pdf"), Err(FetchError::InvalidName(_))));
    }
}
