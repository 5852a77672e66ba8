//! Scratch copies of in-flight uploads
//!
//! Every upload is written to the scratch directory once and removed exactly once,
//! whichever way the request ends. [`ScratchFile::release`] is the normal exit;
//! `Drop` covers early returns and cancelled requests.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    size: u64,
    released: bool,
}

impl ScratchFile {
    /// Write `data` into `dir` under a unique name derived from `original_filename`
    /// and confirm the file is on disk before handing it out.
    pub async fn create(dir: &Path, original_filename: &str, data: Vec<u8>) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let dir_owned = dir.to_path_buf();
        let target = dir.join(format!("{}_{}", Uuid::new_v4().simple(), original_filename));
        let target_clone = target.clone();

        // tempfile is synchronous; keep it off the async workers.
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&dir_owned)?;
            temp.write_all(&data)?;
            temp.flush()?;
            temp.persist(&target_clone).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        let metadata = tokio::fs::metadata(&target).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("scratch file {} is not a regular file", target.display()),
            ));
        }

        tracing::debug!(
            path = %target.display(),
            size_bytes = metadata.len(),
            "Scratch file created"
        );

        Ok(ScratchFile {
            path: target,
            size: metadata.len(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the scratch file. A file that is already gone is not an error.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove scratch file"
            ),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to remove scratch file on drop"
                );
            }
        }
    }
}
