use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const MAX_NAME_LEN: usize = 64;
const FALLBACK_NAME: &str = "upload";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to store uploaded image: {0}")]
    Io(#[from] io::Error),
    #[error("Image exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },
}

/// Creates per-request temp files for uploaded images.
#[derive(Clone, Debug)]
pub struct TempUploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl TempUploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Opens a uniquely named file for `original_name`. Two uploads with the
    /// same filename never share a path.
    pub fn create(&self, original_name: &str) -> Result<TempUpload, UploadError> {
        fs::create_dir_all(&self.dir)?;
        let suffix = format!("-{}", sanitize_filename(original_name));
        let file = tempfile::Builder::new()
            .prefix("identify-")
            .suffix(&suffix)
            .rand_bytes(12)
            .tempfile_in(&self.dir)?;

        Ok(TempUpload {
            file,
            written: 0,
            max_bytes: self.max_bytes,
        })
    }
}

/// An uploaded image on disk. The file is removed when this value is closed
/// or dropped, whichever happens first.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
    written: usize,
    max_bytes: usize,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        if self.written + chunk.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        self.file.write_all(chunk)?;
        self.written += chunk.len();
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), UploadError> {
        self.file.flush()?;
        Ok(())
    }

    /// Deletes the file now, logging instead of failing when removal errors.
    pub fn close(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => log::debug!("Removed temporary image {}", path.display()),
            Err(e) => log::warn!("Failed to remove temporary image {}: {}", path.display(), e),
        }
    }
}

/// Reduces a client supplied filename to something safe to embed in a path:
/// separators become underscores, anything outside `[A-Za-z0-9._-]` is
/// dropped and leading/trailing dots and underscores are trimmed. The result
/// is always a single, non-empty path component.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    let mut safe: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if safe.is_empty() {
        safe.push_str(FALLBACK_NAME);
    }
    safe
}
