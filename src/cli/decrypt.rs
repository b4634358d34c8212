use crate::error::Result;
use crate::clock::SystemClock;
use crate::file::FileCipher;
use crate::keystore::{FileKeyStore, KeyStore, DEFAULT_KEY_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the decrypt command
#[derive(Debug, Clone)]
pub struct DecryptOptions {
    pub key_file: PathBuf,
    /// Write the plaintext here instead of replacing the input
    pub output: Option<PathBuf>,
    /// Maximum token age
    pub ttl: Option<Duration>,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            output: None,
            ttl: None,
        }
    }
}

/// Decrypt a sealed file with the key from the key file.
/// Returns the number of plaintext bytes written.
pub fn decrypt_path(input: &Path, options: &DecryptOptions) -> Result<usize> {
    let store = FileKeyStore::new(&options.key_file);
    debug!(key_file = %store.path().display(), "loading key");
    let cipher = FileCipher::new(store.load()?).with_ttl(options.ttl);
    if options.ttl.is_some() && SystemClock.checked_now().is_none() {
        warn!("system clock is before the Unix epoch, token ages are measured from 0");
    }

    let output = options.output.as_deref().unwrap_or(input);
    let written = cipher.decrypt_to(input, output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = written,
        ttl_secs = options.ttl.map(|t| t.as_secs()),
        "decrypted"
    );
    Ok(written)
}
