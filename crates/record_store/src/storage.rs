use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Environment variable naming the state file used by [`FileStorage::from_env`].
pub const STATE_FILE_ENV: &str = "MEDVERIFY_STATE_FILE";

/// A single-key blob store holding the serialized document.
pub trait StorageBackend: Send {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> std::io::Result<Option<String>>;

    /// Replace the stored blob. Must be all-or-nothing.
    fn save(&mut self, blob: &str) -> std::io::Result<()>;

    fn describe(&self) -> String;
}

/// Document stored as a JSON file, replaced atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `MEDVERIFY_STATE_FILE`, defaulting to `./medverify_state.json`.
    pub fn from_env() -> Self {
        let path = std::env::var(STATE_FILE_ENV)
            .unwrap_or_else(|_| "./medverify_state.json".to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileStorage {
    fn load(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, blob: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut f = File::create(&tmp_path)?;
            f.write_all(blob.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// In-process storage. Clones share the same slot, which lets tests
/// inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> std::io::Result<Option<String>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, blob: &str) -> std::io::Result<()> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(blob.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_clones_share_slot() {
        let storage = MemoryStorage::new();
        let mut writer = storage.clone();
        assert!(storage.load().unwrap().is_none());

        writer.save("{}").unwrap();
        assert_eq!(storage.snapshot().as_deref(), Some("{}"));
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
    }
}
