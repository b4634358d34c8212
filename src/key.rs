//! Key material: a 32-byte secret split into a MAC half and a cipher half.

use crate::error::{Result, SealError};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Total key size in bytes
pub const KEY_SIZE: usize = 32;

/// Size of each sub-key in bytes
pub const SUBKEY_SIZE: usize = KEY_SIZE / 2;

/// Secret key used to seal and open tokens.
///
/// The first 16 bytes authenticate, the last 16 bytes encrypt. The bytes are
/// wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    /// Generate a fresh key from the operating system CSPRNG
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a key from the supplied cryptographically secure source
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Decode the URL-safe base64 form. Surrounding whitespace is ignored.
    pub fn decode(text: &str) -> Result<Self> {
        let raw = Zeroizing::new(
            URL_SAFE
                .decode(text.trim())
                .map_err(|_| SealError::InvalidKeyFormat)?,
        );
        let bytes: [u8; KEY_SIZE] = raw
            .as_slice()
            .try_into()
            .map_err(|_| SealError::InvalidKeyFormat)?;
        Ok(Self { bytes })
    }

    /// URL-safe base64 with padding (44 characters)
    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Sub-key for HMAC-SHA256
    pub fn mac_key(&self) -> &[u8; SUBKEY_SIZE] {
        self.bytes[..SUBKEY_SIZE]
            .try_into()
            .expect("first half of a 32-byte key is 16 bytes")
    }

    /// Sub-key for AES-128-CBC
    pub fn cipher_key(&self) -> &[u8; SUBKEY_SIZE] {
        self.bytes[SUBKEY_SIZE..]
            .try_into()
            .expect("second half of a 32-byte key is 16 bytes")
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for KeyMaterial {}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
