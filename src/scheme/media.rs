//! Pre-playback checks and inline images
//!
//! A viewer checks a video before pointing its player at the scheme URL,
//! and loads small still images (thumbnails, posters) inline as data URLs
//! rather than streaming them.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncReadExt;

use super::error::StreamError;
use super::fs::FilesystemAccess;

/// Result of a successful video check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub file_path: PathBuf,
    pub file_size: u64,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

/// Check that `path` is a playable, non-empty file
///
/// Missing files and directories are `NotFound`; zero-length files are
/// `EmptyFile`. Only metadata is read.
pub async fn check_video(
    fs: &dyn FilesystemAccess,
    path: &Path,
) -> Result<VideoInfo, StreamError> {
    let target = fs.stat(path).await.map_err(|source| StreamError::Internal {
        path: path.display().to_string(),
        source,
    })?;

    if !target.exists {
        return Err(StreamError::NotFound {
            path: path.display().to_string(),
        });
    }
    if target.size == 0 {
        return Err(StreamError::EmptyFile {
            path: path.display().to_string(),
        });
    }

    Ok(VideoInfo {
        file_path: target.path,
        file_size: target.size,
        modified: target.modified,
    })
}

/// Image media type from the file extension; unknown extensions are PNG
pub fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Read a whole image and return it as a `data:` URL
pub async fn image_data_url(
    fs: &dyn FilesystemAccess,
    path: &Path,
) -> Result<String, StreamError> {
    let display = || path.display().to_string();

    let target = fs.stat(path).await.map_err(|source| StreamError::Internal {
        path: display(),
        source,
    })?;
    if !target.exists {
        return Err(StreamError::NotFound { path: display() });
    }

    let mut reader = fs.open_at(path, 0).await.map_err(|source| StreamError::Internal {
        path: display(),
        source,
    })?;
    let mut data = Vec::with_capacity(usize::try_from(target.size).unwrap_or(0));
    reader
        .read_to_end(&mut data)
        .await
        .map_err(|source| StreamError::Internal {
            path: display(),
            source,
        })?;

    Ok(format!(
        "data:{};base64,{}",
        image_content_type(path),
        base64_encode(&data)
    ))
}

const B64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Standard padded base64
fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let n = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << (16 - 8 * i)));
        // One input byte yields two symbols, two yield three, three yield four
        for i in 0..=chunk.len() {
            out.push(char::from(B64[((n >> (18 - 6 * i)) & 0x3f) as usize]));
        }
        for _ in chunk.len()..3 {
            out.push('=');
        }
    }
    out
}
