//! Whole-file sealing with stage-then-commit writes

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SealError};
use crate::key::KeyMaterial;
use crate::token::{decode_token, encode_token, open, seal};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{Builder, NamedTempFile};
use zeroize::Zeroizing;

/// Encrypts and decrypts files with a single key.
///
/// Files are read fully into memory, transformed, then committed through a
/// temporary sibling file and an atomic rename. A failed operation leaves the
/// destination as it was.
#[derive(Debug, Clone)]
pub struct FileCipher<C: Clock = SystemClock> {
    key: KeyMaterial,
    clock: C,
    ttl: Option<Duration>,
}

impl FileCipher<SystemClock> {
    pub fn new(key: KeyMaterial) -> Self {
        Self {
            key,
            clock: SystemClock,
            ttl: None,
        }
    }
}

impl<C: Clock> FileCipher<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> FileCipher<D> {
        FileCipher {
            key: self.key,
            clock,
            ttl: self.ttl,
        }
    }

    /// Reject tokens older than `ttl` on decrypt
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Replace the file's contents with its sealed token (transport encoded)
    pub fn encrypt_file(&self, path: &Path) -> Result<usize> {
        self.encrypt_to(path, path)
    }

    /// Replace the file's sealed contents with the recovered plaintext
    pub fn decrypt_file(&self, path: &Path) -> Result<usize> {
        self.decrypt_to(path, path)
    }

    /// Seal `input` and write the encoded token to `output`.
    /// Returns the number of bytes written.
    pub fn encrypt_to(&self, input: &Path, output: &Path) -> Result<usize> {
        let plaintext = Zeroizing::new(fs::read(input)?);
        let token = seal(&plaintext, &self.key, self.clock.now());
        let encoded = encode_token(&token);
        commit(output, encoded.as_bytes())?;
        Ok(encoded.len())
    }

    /// Open the token stored in `input` and write the plaintext to `output`.
    /// Returns the number of bytes written.
    pub fn decrypt_to(&self, input: &Path, output: &Path) -> Result<usize> {
        let text = fs::read(input)?;
        // Non UTF-8 content cannot be a base64 token
        let text = std::str::from_utf8(&text).map_err(|_| SealError::MalformedToken)?;
        let token = decode_token(text)?;
        let plaintext = Zeroizing::new(open(&token, &self.key, self.clock.now(), self.ttl)?);
        commit(output, &plaintext)?;
        Ok(plaintext.len())
    }
}

/// Write `contents` to a temporary file next to `path`, flush it, then
/// rename it over `path`. An existing symlink is followed so the file it
/// points at is replaced; its permissions are carried over.
pub(crate) fn commit(path: &Path, contents: &[u8]) -> Result<()> {
    let target = resolve_target(path)?;
    let staged = stage(&target, contents)?;
    staged.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

/// Like [`commit`], but fails with `AlreadyExists` instead of replacing an
/// existing `path`.
pub(crate) fn commit_new(path: &Path, contents: &[u8]) -> Result<()> {
    let staged = stage(path, contents)?;
    staged.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}

fn resolve_target(path: &Path) -> Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(fs::canonicalize(path)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(e.into()),
    }
}

fn stage(target: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = Builder::new()
        .prefix(".sealfile-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;

    if let Ok(existing) = fs::metadata(target) {
        staged.as_file().set_permissions(existing.permissions())?;
    }
    Ok(staged)
}
