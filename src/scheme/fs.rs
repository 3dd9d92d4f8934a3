//! Filesystem access seam
//!
//! Everything the handler needs from the filesystem: a fresh stat per
//! request and a read handle positioned at a byte offset.

use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncSeekExt};

/// Read handle positioned at the start of a byte window
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// File resolved for a single request; never cached across requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub path: PathBuf,
    pub size: u64,
    /// A regular file exists at `path`
    pub exists: bool,
    pub modified: Option<SystemTime>,
}

impl FileTarget {
    pub fn missing(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: 0,
            exists: false,
            modified: None,
        }
    }
}

#[async_trait]
pub trait FilesystemAccess: Send + Sync {
    /// Stat `path`. A missing file is `Ok` with `exists == false`;
    /// other failures are errors.
    async fn stat(&self, path: &Path) -> io::Result<FileTarget>;

    /// Open `path` for reading, positioned at `start`
    async fn open_at(&self, path: &Path, start: u64) -> io::Result<ByteReader>;
}

/// Local disk through `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

#[async_trait]
impl FilesystemAccess for LocalFilesystem {
    async fn stat(&self, path: &Path) -> io::Result<FileTarget> {
        match tokio::fs::metadata(path).await {
            // Directories and other non-files are not servable
            Ok(meta) if !meta.is_file() => Ok(FileTarget::missing(path)),
            Ok(meta) => Ok(FileTarget {
                path: path.to_path_buf(),
                size: meta.len(),
                exists: true,
                modified: meta.modified().ok(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileTarget::missing(path)),
            Err(e) => Err(e),
        }
    }

    async fn open_at(&self, path: &Path, start: u64) -> io::Result<ByteReader> {
        let mut file = tokio::fs::File::open(path).await?;
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_stat_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"0123456789").unwrap();

        let target = LocalFilesystem.stat(&path).await.unwrap();
        assert!(target.exists);
        assert_eq!(target.size, 10);
        assert!(target.modified.is_some());
    }

    #[tokio::test]
    async fn test_stat_missing_and_directory() {
        let dir = tempfile::tempdir().unwrap();

        let missing = LocalFilesystem.stat(&dir.path().join("nope.mp4")).await.unwrap();
        assert!(!missing.exists);

        let directory = LocalFilesystem.stat(dir.path()).await.unwrap();
        assert!(!directory.exists);
    }

    #[tokio::test]
    async fn test_open_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut reader = LocalFilesystem.open_at(&path, 7).await.unwrap();
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"789");
    }
}
