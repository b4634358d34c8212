use crate::error::Result;
use crate::key::KeyMaterial;
use crate::keystore::{FileKeyStore, KeyStore, DEFAULT_KEY_FILE};
use std::path::PathBuf;
use tracing::{info, warn};

/// Options for the keygen command
#[derive(Debug, Clone)]
pub struct KeygenOptions {
    pub key_file: PathBuf,
    /// Replace an existing key file
    pub force: bool,
}

impl Default for KeygenOptions {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            force: false,
        }
    }
}

/// Generate a new key and save it to the key file.
///
/// An existing key is only replaced with `force`; files sealed under the old
/// key cannot be opened afterwards.
pub fn generate_key_file(options: &KeygenOptions) -> Result<()> {
    let store = FileKeyStore::new(&options.key_file);
    let key = KeyMaterial::generate();

    if options.force {
        if store.exists() {
            warn!(key_file = %store.path().display(), "replacing existing key");
        }
        store.save(&key)?;
    } else {
        store.create(&key)?;
    }

    info!(key_file = %store.path().display(), "key generated");
    Ok(())
}
