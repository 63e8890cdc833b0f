//! Document store - uploaded CSV bytes keyed by opaque access codes.
//!
//! Each document lives in the upload directory as `<code>.csv` with a
//! `<code>.json` metadata sidecar. Codes are UUID v4, generated here;
//! documents are immutable once written and disappear only via
//! [`DocumentStore::delete`]. All filesystem work goes through
//! `tokio::fs`, so a cancelled request aborts at the read boundary with
//! no partial side effects.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Store configuration, passed in at construction.
///
/// There is deliberately no global fallback; whoever builds the store owns
/// the directory and the limits.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory where documents are written (created on first save).
    pub dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_bytes: usize,
    /// Accepted file extensions, lowercase without the dot. Uploads that
    /// carry no file name skip this check.
    pub allowed_extensions: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            max_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["csv".to_string(), "txt".to_string()],
        }
    }
}

/// Metadata sidecar stored next to each document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Opaque access code (UUID v4, hyphenated).
    pub access_code: String,
    /// Original file name from the upload, if any.
    pub file_name: Option<String>,
    /// Document size in bytes.
    pub size: usize,
    /// Upload timestamp, RFC 3339.
    pub uploaded_at: String,
}

/// Disk-backed key→bytes store for uploaded documents.
pub struct DocumentStore {
    config: StoreConfig,
}

impl DocumentStore {
    /// Create a store over the given configuration.
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Save uploaded bytes under a fresh access code.
    pub async fn save(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> StorageResult<DocumentMeta> {
        if bytes.len() > self.config.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.config.max_bytes,
            });
        }

        if let Some(name) = file_name {
            let ext = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !self.config.allowed_extensions.iter().any(|a| *a == ext) {
                let shown = if ext.is_empty() { name.to_string() } else { ext };
                return Err(StorageError::BadExtension(shown));
            }
        }

        fs::create_dir_all(&self.config.dir).await?;

        let code = Uuid::new_v4().to_string();
        let meta = DocumentMeta {
            access_code: code.clone(),
            file_name: file_name.map(|s| s.to_string()),
            size: bytes.len(),
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        };

        fs::write(self.document_path(&code), bytes).await?;
        fs::write(self.meta_path(&code), serde_json::to_string_pretty(&meta)?).await?;

        Ok(meta)
    }

    /// Read a document's bytes back by access code.
    ///
    /// The code is validated as a UUID before the filesystem is touched, so
    /// malformed input is an invalid-code error rather than a path probe.
    pub async fn read(&self, code: &str) -> StorageResult<Vec<u8>> {
        let code = checked_code(code)?;
        match fs::read(self.document_path(&code)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a document and its metadata sidecar.
    pub async fn delete(&self, code: &str) -> StorageResult<()> {
        let code = checked_code(code)?;
        match fs::remove_file(self.document_path(&code)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
            Err(e) => return Err(e.into()),
        }
        // Sidecar may already be gone.
        let _ = fs::remove_file(self.meta_path(&code)).await;
        Ok(())
    }

    /// List metadata for every stored document, oldest first.
    ///
    /// Unreadable or stale sidecars are skipped rather than failing the
    /// whole listing.
    pub async fn list(&self) -> StorageResult<Vec<DocumentMeta>> {
        let mut metas = Vec::new();

        let mut entries = match fs::read_dir(&self.config.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(metas),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path).await {
                    if let Ok(meta) = serde_json::from_str::<DocumentMeta>(&content) {
                        metas.push(meta);
                    }
                }
            }
        }

        metas.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(metas)
    }

    fn document_path(&self, code: &str) -> PathBuf {
        self.config.dir.join(format!("{code}.csv"))
    }

    fn meta_path(&self, code: &str) -> PathBuf {
        self.config.dir.join(format!("{code}.json"))
    }
}

/// Normalize an access code to the canonical hyphenated form.
fn checked_code(code: &str) -> StorageResult<String> {
    Uuid::parse_str(code)
        .map(|u| u.to_string())
        .map_err(|_| StorageError::InvalidCode(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> DocumentStore {
        DocumentStore::new(StoreConfig {
            dir: dir.to_path_buf(),
            ..StoreConfig::default()
        })
    }

    #[tokio::test]
    async fn test_save_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let meta = store.save(b"a,b\n1,2\n", Some("data.csv")).await.unwrap();
        assert_eq!(meta.size, 8);
        assert_eq!(meta.file_name.as_deref(), Some("data.csv"));

        let bytes = store.read(&meta.access_code).await.unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_codes_are_unique() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let a = store.save(b"x\n1\n", None).await.unwrap();
        let b = store.save(b"x\n1\n", None).await.unwrap();
        assert_ne!(a.access_code, b.access_code);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let code = Uuid::new_v4().to_string();
        let err = store.read(&code).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_code_rejected_before_fs() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let err = store.read("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidCode(_)));
    }

    #[tokio::test]
    async fn test_code_form_normalized() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let meta = store.save(b"x\n1\n", None).await.unwrap();
        let upper = meta.access_code.to_uppercase();
        assert!(store.read(&upper).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(StoreConfig {
            dir: dir.path().to_path_buf(),
            max_bytes: 4,
            ..StoreConfig::default()
        });

        let err = store.save(b"a,b\n1,2\n", None).await.unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { size: 8, limit: 4 }));
    }

    #[tokio::test]
    async fn test_bad_extension_rejected() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let err = store.save(b"x", Some("evil.exe")).await.unwrap_err();
        assert!(matches!(err, StorageError::BadExtension(ref e) if e == "exe"));
    }

    #[tokio::test]
    async fn test_nameless_upload_accepted() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.save(b"a\n1\n", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_document_and_meta() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let meta = store.save(b"a\n1\n", Some("x.csv")).await.unwrap();
        store.delete(&meta.access_code).await.unwrap();

        let err = store.read(&meta.access_code).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_saved_documents() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.save(b"a\n1\n", Some("one.csv")).await.unwrap();
        store.save(b"b\n2\n", Some("two.csv")).await.unwrap();

        let metas = store.list().await.unwrap();
        assert_eq!(metas.len(), 2);
    }

    #[tokio::test]
    async fn test_list_empty_when_dir_missing() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("never-created"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
