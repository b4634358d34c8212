use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SealError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid key format: expected URL-safe base64 encoding of 32 bytes")]
    InvalidKeyFormat,

    #[error("Key not found. Please generate one first.")]
    KeyNotFound,

    #[error("Key file {0} already exists (use --force to replace it)")]
    KeyExists(PathBuf),

    #[error("Malformed token")]
    MalformedToken,

    #[error("Unsupported token version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    /// Wrong key, corrupted ciphertext and tampered tokens all land here.
    #[error("Token authentication failed")]
    AuthenticationFailed,

    #[error("Token expired or timestamp is in the future")]
    TokenExpired,

    #[error("Invalid padding")]
    InvalidPadding,
}

pub type Result<T> = std::result::Result<T, SealError>;
