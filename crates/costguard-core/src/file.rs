//! Source files submitted for invoice ingestion

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Extensions the ingestion backend accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls", "pdf"];

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Identity of a selected file: name plus modification time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey(String);

impl FileKey {
    pub fn new(name: &str, last_modified: u64) -> Self {
        Self(format!("{}-{}", name, last_modified))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file held in memory, ready to be sent as a multipart part
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    /// Milliseconds since the Unix epoch
    last_modified: u64,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Content type is derived from the file name's extension
    pub fn new(name: impl Into<String>, last_modified: u64, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_string();
        Self {
            name,
            last_modified,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a local file, taking its modification time from filesystem metadata
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let metadata = tokio::fs::metadata(path).await?;

        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(file = %name, size = bytes.len(), "Loaded source file");
        Ok(Self::new(name, last_modified, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn key(&self) -> FileKey {
        FileKey::new(&self.name, self.last_modified)
    }

    /// Whether the backend accepts this file type
    pub fn is_supported(&self) -> bool {
        is_supported(&self.name)
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("last_modified", &self.last_modified)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `name` has one of the supported extensions
pub fn is_supported(name: &str) -> bool {
    extension(name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// MIME type for a file name
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("march.csv"), "text/csv");
        assert_eq!(content_type_for("MARCH.PDF"), "application/pdf");
        assert_eq!(content_type_for("book.xls"), "application/vnd.ms-excel");
        assert_eq!(content_type_for("notes.txt"), "application/octet-stream");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported("a.csv"));
        assert!(is_supported("a.XLSX"));
        assert!(!is_supported("a.docx"));
        assert!(!SourceFile::new("a.png", 1, Vec::<u8>::new()).is_supported());
    }

    #[test]
    fn test_key_combines_name_and_mtime() {
        let file = SourceFile::new("invoice.pdf", 1_700_000_000_000, b"%PDF".to_vec());
        assert_eq!(file.key().as_str(), "invoice.pdf-1700000000000");
        assert_eq!(file.len(), 4);
        assert_eq!(file.content_type(), "application/pdf");
    }

    #[tokio::test]
    async fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.csv");
        let mut handle = std::fs::File::create(&path).unwrap();
        handle.write_all(b"sku,qty\nA,1\n").unwrap();
        drop(handle);

        let file = SourceFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "vendor.csv");
        assert_eq!(file.content_type(), "text/csv");
        assert_eq!(&file.bytes()[..], b"sku,qty\nA,1\n");
        assert!(file.last_modified() > 0);
    }

    #[tokio::test]
    async fn test_from_missing_path() {
        let err = SourceFile::from_path("/definitely/not/here.csv").await.unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }
}
