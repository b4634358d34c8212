use crate::error::Result;
use crate::clock::SystemClock;
use crate::file::FileCipher;
use crate::keystore::{FileKeyStore, KeyStore, DEFAULT_KEY_FILE};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options for the encrypt command
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    pub key_file: PathBuf,
    /// Write the token here instead of replacing the input
    pub output: Option<PathBuf>,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            output: None,
        }
    }
}

/// Encrypt a file with the key from the key file.
/// Returns the number of bytes written.
pub fn encrypt_path(input: &Path, options: &EncryptOptions) -> Result<usize> {
    let store = FileKeyStore::new(&options.key_file);
    debug!(key_file = %store.path().display(), "loading key");
    let cipher = FileCipher::new(store.load()?);
    if SystemClock.checked_now().is_none() {
        warn!("system clock is before the Unix epoch, tokens will carry timestamp 0");
    }

    let output = options.output.as_deref().unwrap_or(input);
    let written = cipher.encrypt_to(input, output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = written,
        "encrypted"
    );
    Ok(written)
}
