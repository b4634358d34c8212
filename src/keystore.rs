use crate::error::{Result, SealError};
use crate::file::{commit, commit_new};
use crate::key::KeyMaterial;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zeroize::Zeroizing;

/// Default key file name, relative to the working directory
pub const DEFAULT_KEY_FILE: &str = "key.key";

/// Durable home for the key
pub trait KeyStore {
    fn load(&self) -> Result<KeyMaterial>;
    fn save(&self, key: &KeyMaterial) -> Result<()>;
}

/// Key stored as its base64url text, alone in a file
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Save `key` unless a key file is already present. The existence check
    /// and the write are a single no-clobber rename.
    pub fn create(&self, key: &KeyMaterial) -> Result<()> {
        let encoded = Zeroizing::new(key.encode());
        match commit_new(&self.path, encoded.as_bytes()) {
            Err(SealError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                Err(SealError::KeyExists(self.path.clone()))
            }
            other => other,
        }
    }
}

impl Default for FileKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_FILE)
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<KeyMaterial> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => Zeroizing::new(text),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(SealError::KeyNotFound),
            Err(e) => return Err(e.into()),
        };
        KeyMaterial::decode(&text)
    }

    fn save(&self, key: &KeyMaterial) -> Result<()> {
        let encoded = Zeroizing::new(key.encode());
        commit(&self.path, encoded.as_bytes())
    }
}

/// In-process key slot
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    slot: Mutex<Option<KeyMaterial>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: KeyMaterial) -> Self {
        Self {
            slot: Mutex::new(Some(key)),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<KeyMaterial> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.clone().ok_or(SealError::KeyNotFound)
    }

    fn save(&self, key: &KeyMaterial) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(key.clone());
        Ok(())
    }
}
