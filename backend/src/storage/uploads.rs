use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// A scratch file owned by one request. Deleted by [`TempArtifact::remove`],
/// or on drop if the owner returned early.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    removed: bool,
}

impl TempArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => log::debug!("Deleted temp file {}", self.path.display()),
            Err(e) => log::warn!("Failed to delete temp file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Deleted temp file {} on drop", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete temp file {}: {}", self.path.display(), e),
        }
    }
}

/// The scratch directory that uploads, decoded images and archives are written to.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn unique_path(&self, extension: &str) -> PathBuf {
        let uuid = Uuid::new_v4();
        if extension.is_empty() {
            self.root.join(uuid.to_string())
        } else {
            self.root.join(format!("{}.{}", uuid, extension))
        }
    }

    /// Reserves a fresh path; the artifact owns whatever gets written there.
    pub fn reserve(&self, extension: &str) -> TempArtifact {
        TempArtifact::new(self.unique_path(extension))
    }

    pub async fn write(&self, extension: &str, content: &[u8]) -> io::Result<TempArtifact> {
        let artifact = self.reserve(extension);
        fs::write(artifact.path(), content).await?;
        log::debug!("Wrote temp file {}", artifact.path().display());
        Ok(artifact)
    }

    /// Deletes files left behind by a previous run. Returns how many were removed.
    pub async fn sweep(&self) -> io::Result<usize> {
        if !fs::try_exists(&self.root).await? {
            return Ok(0);
        }

        let mut entries = fs::read_dir(&self.root).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to sweep {}: {}", entry.path().display(), e),
            }
        }
        Ok(removed)
    }
}
