use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::UploadError;

/// Destination directory for uploaded files.
#[derive(Debug, Clone)]
pub struct Uploads {
    dir: PathBuf,
    max_bytes: u64,
}

impl Uploads {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Opens `<uuid>-<basename>` under the uploads directory for writing.
    pub async fn stage(&self, original_name: &str) -> Result<StagedUpload, UploadError> {
        fs::create_dir_all(&self.dir).await?;

        let filename = format!("{}-{}", Uuid::new_v4(), basename(original_name));
        let path = self.dir.join(&filename);
        let file = fs::File::create(&path).await?;
        tracing::debug!(path = %path.display(), "staged upload");

        Ok(StagedUpload {
            path,
            filename,
            file,
            written: 0,
            limit: self.max_bytes,
        })
    }
}

/// A partially written upload. Either [`finish`](Self::finish) or
/// [`discard`](Self::discard) it.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    filename: String,
    file: fs::File,
    written: u64,
    limit: u64,
}

impl StagedUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Appends a chunk, failing once the running total passes the limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        let total = self.written + chunk.len() as u64;
        if total > self.limit {
            return Err(UploadError::TooLarge { limit: self.limit });
        }
        self.file.write_all(chunk).await?;
        self.written = total;
        Ok(())
    }

    /// Flushes to disk and returns the stored path.
    pub async fn finish(mut self) -> Result<PathBuf, UploadError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.path)
    }

    pub async fn discard(self) {
        let StagedUpload { path, file, .. } = self;
        drop(file);
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove staged upload");
        }
    }
}

fn basename(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
}
