use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::error;

use crate::error::{Error, Result};

/// Writes assets into a local directory.
#[derive(Debug, Clone)]
pub struct LocalSink {
    dir: PathBuf,
}

impl LocalSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Atomic write through a uniquely named temp file in the same directory.
    /// Concurrent writers of one filename all succeed. Returns the final path.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.dir.clone();
        let path = self.dir.join(filename);
        let target = path.clone();
        let bytes = bytes.to_vec();

        let persisted = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            match tmp.persist(&target) {
                Ok(_) => Ok(()),
                // another writer got there first with the same name
                Err(_) if target.is_file() => Ok(()),
                Err(e) => Err(e.error),
            }
        })
        .await
        .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;

        if let Err(err) = persisted {
            error!(path = %path.display(), "qr write failed: {}", err);
            return Err(Error::Persistence(format!("{}: {}", path.display(), err)));
        }
        Ok(path.display().to_string())
    }
}
