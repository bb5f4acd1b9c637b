//! Model persistence store
//!
//! The orchestrator persists and reloads classifier state through an opaque
//! key-value interface. Keys name a classifier and lifecycle stage
//! (`"<Name>_base_model"` / `"<Name>_fine_tuned_model"`); repeated saves
//! overwrite, loads of absent keys fail with [`FairtuneError::ArtifactNotFound`].

use crate::error::{FairtuneError, Result};
use crate::models::ClassifierModel;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Opaque save/load interface for classifier artifacts
pub trait ModelStore {
    /// Persist `model` under `key`, replacing any previous artifact
    fn save(&self, key: &str, model: &ClassifierModel) -> Result<()>;

    /// Restore the artifact stored under `key`
    fn load(&self, key: &str) -> Result<ClassifierModel>;
}

/// In-memory store backed by a byte map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized bytes currently stored under `key`
    pub fn snapshot(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    /// Keys with a stored artifact, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ModelStore for MemoryStore {
    fn save(&self, key: &str, model: &ClassifierModel) -> Result<()> {
        let bytes = serde_json::to_vec(model)?;
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), bytes);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<ClassifierModel> {
        let entries = self.entries.lock().expect("store lock poisoned");
        let bytes = entries.get(key).ok_or_else(|| FairtuneError::ArtifactNotFound {
            key: key.to_string(),
        })?;
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// On-disk store: one JSON file per key under a base directory
#[derive(Debug)]
pub struct FsStore {
    base_dir: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn artifact_path(&self, key: &str) -> PathBuf {
        // Keys contain '/' in classifier names; keep one flat file per key
        let file_name: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.base_dir.join(format!("{file_name}.json"))
    }
}

impl ModelStore for FsStore {
    fn save(&self, key: &str, model: &ClassifierModel) -> Result<()> {
        let json = serde_json::to_string(model)?;
        std::fs::write(self.artifact_path(key), json)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<ClassifierModel> {
        let path = self.artifact_path(key);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FairtuneError::ArtifactNotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }
}
