//! Scoped temporary files.
//!
//! An [`EphemeralFile`] deletes its path when dropped. A failed deletion (for
//! example a file still held open by another process) is retried once after
//! [`DELETE_RETRY_DELAY`] and then abandoned with a warning; it never panics
//! and never surfaces an error to the owner.
//!
//! [`OwnedArtifact`] is the hand-off form: the producer gives up the path and
//! the consumer performs the final read-then-delete.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, warn};

pub const DELETE_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct EphemeralFile {
    path: PathBuf,
    armed: bool,
}

impl EphemeralFile {
    /// Create a new empty file with a random name inside `dir`.
    pub fn create_in(dir: &Path, prefix: &str, suffix: &str) -> io::Result<Self> {
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?
            .into_temp_path()
            .keep()?;
        debug!("[EPHEMERAL] Acquired {}", path.display());
        Ok(Self { path, armed: true })
    }

    /// Take ownership of a file that already exists on disk.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, contents: impl AsRef<[u8]>) -> io::Result<()> {
        tokio::fs::write(&self.path, contents).await
    }

    /// Delete now, waiting out the retry delay on the async runtime.
    pub async fn release(mut self) {
        self.armed = false;
        remove_with_retry(&self.path).await;
    }

    /// Hand the file to a consumer without deleting it.
    pub fn into_artifact(mut self) -> OwnedArtifact {
        self.armed = false;
        OwnedArtifact {
            file: Self::adopt(std::mem::take(&mut self.path)),
        }
    }

    fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for EphemeralFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match try_remove(&self.path) {
            Ok(()) => {}
            Err(e) => {
                debug!(
                    "[EPHEMERAL] Delete of {} failed ({}), retrying in {:?}",
                    self.path.display(),
                    e,
                    DELETE_RETRY_DELAY
                );
                // Drop cannot await, so the single retry runs off-thread.
                let path = self.path.clone();
                std::thread::spawn(move || {
                    std::thread::sleep(DELETE_RETRY_DELAY);
                    if let Err(e) = try_remove(&path) {
                        warn!("[EPHEMERAL] Abandoning {}: {}", path.display(), e);
                    }
                });
            }
        }
    }
}

/// A generated file whose ownership has been transferred to the caller.
///
/// Dropping it unread still deletes the file.
#[derive(Debug)]
pub struct OwnedArtifact {
    file: EphemeralFile,
}

impl OwnedArtifact {
    /// Take ownership of a file another component produced.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            file: EphemeralFile::adopt(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn exists(&self) -> bool {
        self.file.path().is_file()
    }

    /// Read the artifact and delete it.
    pub async fn read_and_release(self) -> io::Result<Vec<u8>> {
        let result = tokio::fs::read(self.path()).await;
        self.file.release().await;
        result
    }

    pub async fn read_to_string_and_release(self) -> io::Result<String> {
        let result = tokio::fs::read_to_string(self.path()).await;
        self.file.release().await;
        result
    }

    /// Keep the file on disk and return its path. The caller now manages it.
    pub fn persist(self) -> PathBuf {
        self.file.disarm()
    }
}

fn try_remove(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn remove_with_retry(path: &Path) {
    if let Err(first) = try_remove(path) {
        debug!(
            "[EPHEMERAL] Delete of {} failed ({}), retrying in {:?}",
            path.display(),
            first,
            DELETE_RETRY_DELAY
        );
        tokio::time::sleep(DELETE_RETRY_DELAY).await;
        if let Err(e) = try_remove(path) {
            warn!("[EPHEMERAL] Abandoning {}: {}", path.display(), e);
        }
    }
}
