//! Sealfile - authenticated symmetric file encryption
//!
//! Files are sealed into self-describing tokens under a 32-byte key. The
//! first half of the key authenticates, the second half encrypts.
//!
//! ## Token Layout
//!
//! ```text
//! 0x80 | timestamp (u64 BE) | IV (16) | AES-128-CBC ciphertext | HMAC-SHA256 tag (32)
//! ```
//!
//! Opening a token checks framing, then the version byte, then the tag in
//! constant time. The optional maximum age and the padding are only examined
//! once the tag has verified, so a forged token can only ever produce
//! [`SealError::AuthenticationFailed`].
//!
//! On disk, tokens and keys are URL-safe base64 text.
//!
//! ## Example
//!
//! ```no_run
//! use sealfile::{FileCipher, FileKeyStore, KeyMaterial, KeyStore};
//! use std::path::Path;
//!
//! let store = FileKeyStore::new("key.key");
//! store.save(&KeyMaterial::generate()).unwrap();
//!
//! let cipher = FileCipher::new(store.load().unwrap());
//! cipher.encrypt_file(Path::new("notes.txt")).unwrap();
//! cipher.decrypt_file(Path::new("notes.txt")).unwrap();
//! ```

pub mod cli;
pub mod clock;
pub mod error;
pub mod file;
pub mod key;
pub mod keystore;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, SealError};
pub use file::FileCipher;
pub use key::KeyMaterial;
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use token::{decode_token, encode_token, open, seal, TokenParts};
