//! Sealed token codec
//!
//! ```text
//! version (1) || timestamp (8, BE) || IV (16) || ciphertext (16*n) || tag (32)
//! ```
//!
//! The tag is HMAC-SHA256 under the MAC half of the key over every byte
//! before it. The ciphertext is AES-128-CBC under the cipher half of the key.

use crate::error::{Result, SealError};
use crate::key::KeyMaterial;
use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Scheme revision tag
pub const VERSION: u8 = 0x80;

pub const TIMESTAMP_SIZE: usize = 8;
pub const IV_SIZE: usize = 16;
pub const BLOCK_SIZE: usize = 16;
pub const TAG_SIZE: usize = 32;

/// version + timestamp + IV
pub const HEADER_SIZE: usize = 1 + TIMESTAMP_SIZE + IV_SIZE;

/// Smallest structurally valid token (no ciphertext blocks)
pub const MIN_TOKEN_SIZE: usize = HEADER_SIZE + TAG_SIZE;

/// Structural view of a raw token. Parsing checks framing only; nothing
/// here has been authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub version: u8,
    pub timestamp: u64,
    pub iv: [u8; IV_SIZE],
    pub ciphertext: &'a [u8],
    pub tag: &'a [u8],
    signed: &'a [u8],
}

impl<'a> TokenParts<'a> {
    pub fn parse(token: &'a [u8]) -> Result<Self> {
        if token.len() < MIN_TOKEN_SIZE || (token.len() - MIN_TOKEN_SIZE) % BLOCK_SIZE != 0 {
            return Err(SealError::MalformedToken);
        }

        let (signed, tag) = token.split_at(token.len() - TAG_SIZE);
        let version = signed[0];

        let mut timestamp_bytes = [0u8; TIMESTAMP_SIZE];
        timestamp_bytes.copy_from_slice(&signed[1..1 + TIMESTAMP_SIZE]);

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&signed[1 + TIMESTAMP_SIZE..HEADER_SIZE]);

        Ok(Self {
            version,
            timestamp: u64::from_be_bytes(timestamp_bytes),
            iv,
            ciphertext: &signed[HEADER_SIZE..],
            tag,
            signed,
        })
    }

    /// Bytes covered by the tag
    pub fn signed_bytes(&self) -> &'a [u8] {
        self.signed
    }
}

/// Raw token length produced by sealing `plaintext_len` bytes
pub fn sealed_len(plaintext_len: usize) -> usize {
    MIN_TOKEN_SIZE + (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Seal `plaintext` at time `now`, drawing the IV from the OS CSPRNG
pub fn seal(plaintext: &[u8], key: &KeyMaterial, now: u64) -> Vec<u8> {
    seal_with_rng(plaintext, key, now, &mut OsRng)
}

/// Seal with an injected random source
pub fn seal_with_rng<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    key: &KeyMaterial,
    now: u64,
    rng: &mut R,
) -> Vec<u8> {
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);
    seal_with_iv(plaintext, key, now, iv)
}

fn seal_with_iv(plaintext: &[u8], key: &KeyMaterial, now: u64, iv: [u8; IV_SIZE]) -> Vec<u8> {
    let padded = pad(plaintext);
    let ciphertext = Aes128CbcEnc::new(key.cipher_key().into(), &iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(&padded);

    let mut token = Vec::with_capacity(HEADER_SIZE + ciphertext.len() + TAG_SIZE);
    token.push(VERSION);
    token.extend_from_slice(&now.to_be_bytes());
    token.extend_from_slice(&iv);
    token.extend_from_slice(&ciphertext);

    let tag = compute_tag(key, &token);
    token.extend_from_slice(&tag);
    token
}

/// Verify and decrypt a raw token.
///
/// Checks run in a fixed order: framing, version, tag, age (only when `ttl`
/// is set), padding. Age and padding are only looked at once the tag has
/// verified.
pub fn open(
    token: &[u8],
    key: &KeyMaterial,
    now: u64,
    ttl: Option<Duration>,
) -> Result<Vec<u8>> {
    let parts = TokenParts::parse(token)?;
    if parts.version != VERSION {
        return Err(SealError::UnsupportedVersion(parts.version));
    }

    let expected = compute_tag(key, parts.signed_bytes());
    if !bool::from(expected[..].ct_eq(parts.tag)) {
        return Err(SealError::AuthenticationFailed);
    }

    if let Some(ttl) = ttl {
        check_age(parts.timestamp, now, ttl)?;
    }

    let padded = Aes128CbcDec::new(key.cipher_key().into(), &parts.iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(parts.ciphertext)
        .map_err(|_| SealError::MalformedToken)?;
    unpad(padded)
}

/// URL-safe base64 transport form, padding preserved
pub fn encode_token(token: &[u8]) -> String {
    URL_SAFE.encode(token)
}

/// Inverse of [`encode_token`]; surrounding whitespace is ignored
pub fn decode_token(text: &str) -> Result<Vec<u8>> {
    URL_SAFE
        .decode(text.trim())
        .map_err(|_| SealError::MalformedToken)
}

fn compute_tag(key: &KeyMaterial, signed: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac =
        HmacSha256::new_from_slice(key.mac_key()).expect("HMAC can take key of any size");
    mac.update(signed);
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

fn check_age(timestamp: u64, now: u64, ttl: Duration) -> Result<()> {
    let age = i128::from(now) - i128::from(timestamp);
    if age < 0 || age > i128::from(ttl.as_secs()) {
        return Err(SealError::TokenExpired);
    }
    Ok(())
}

/// Block padding: 1..=16 bytes, each equal to the pad length
fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    let pad_len = match data.last() {
        Some(&last) => last as usize,
        None => return Err(SealError::InvalidPadding),
    };
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(SealError::InvalidPadding);
    }

    let body_len = data.len() - pad_len;
    if !data[body_len..].iter().all(|&b| b as usize == pad_len) {
        return Err(SealError::InvalidPadding);
    }

    data.truncate(body_len);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FERNET_SECRET: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
    const FERNET_TOKEN: &str = "gAAAAAAdwJ6wAAECAwQFBgcICQoLDA0ODy021cpGVWKZ_eEwCGM4BLLF_5CV9dOPmrhuVUPgJobwOz7JcbmrR64jVmpU4IwqDA==";
    const FERNET_NOW: u64 = 499_162_800;

    fn counting_iv() -> [u8; IV_SIZE] {
        let mut iv = [0u8; IV_SIZE];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = i as u8;
        }
        iv
    }

    /// Assemble an authentic token around arbitrary ciphertext
    fn forge_authentic(key: &KeyMaterial, now: u64, ciphertext: &[u8]) -> Vec<u8> {
        let mut token = vec![VERSION];
        token.extend_from_slice(&now.to_be_bytes());
        token.extend_from_slice(&counting_iv());
        token.extend_from_slice(ciphertext);
        let tag = compute_tag(key, &token);
        token.extend_from_slice(&tag);
        token
    }

    #[test]
    fn test_known_answer_seal() {
        let key = KeyMaterial::decode(FERNET_SECRET).unwrap();
        let token = seal_with_iv(b"hello", &key, FERNET_NOW, counting_iv());
        assert_eq!(encode_token(&token), FERNET_TOKEN);
    }

    #[test]
    fn test_known_answer_open() {
        let key = KeyMaterial::decode(FERNET_SECRET).unwrap();
        let token = decode_token(FERNET_TOKEN).unwrap();
        let plaintext = open(&token, &key, FERNET_NOW + 60, Some(Duration::from_secs(60))).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_hello_world_scenario() {
        let key = KeyMaterial::generate();
        let other = KeyMaterial::generate();

        let token = seal(b"hello world", &key, 1000);
        assert_eq!(token.len(), 73);
        assert_eq!(sealed_len(11), 73);

        assert_eq!(open(&token, &key, 1000, None).unwrap(), b"hello world");
        assert!(matches!(
            open(&token, &other, 1000, None),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_layout_fields() {
        let key = KeyMaterial::generate();
        let token = seal_with_iv(b"abc", &key, 0x0102_0304_0506_0708, counting_iv());
        let parts = TokenParts::parse(&token).unwrap();

        assert_eq!(parts.version, VERSION);
        assert_eq!(parts.timestamp, 0x0102_0304_0506_0708);
        assert_eq!(&token[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(parts.iv, counting_iv());
        assert_eq!(parts.ciphertext.len(), BLOCK_SIZE);
        assert_eq!(parts.tag.len(), TAG_SIZE);
        assert_eq!(parts.signed_bytes(), &token[..token.len() - TAG_SIZE]);
    }

    #[test]
    fn test_empty_and_block_aligned_plaintext() {
        let key = KeyMaterial::generate();

        let empty = seal(b"", &key, 5);
        assert_eq!(empty.len(), MIN_TOKEN_SIZE + BLOCK_SIZE);
        assert_eq!(open(&empty, &key, 5, None).unwrap(), b"");

        // A full block always gains a whole block of padding
        let aligned = seal(&[0x42; 16], &key, 5);
        assert_eq!(aligned.len(), MIN_TOKEN_SIZE + 2 * BLOCK_SIZE);
        assert_eq!(open(&aligned, &key, 5, None).unwrap(), vec![0x42; 16]);
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let key = KeyMaterial::generate();
        let a = seal(b"same plaintext", &key, 7);
        let b = seal(b"same plaintext", &key, 7);

        let pa = TokenParts::parse(&a).unwrap();
        let pb = TokenParts::parse(&b).unwrap();
        assert_eq!(pa.timestamp, pb.timestamp);
        assert_ne!(pa.iv, pb.iv);
        assert_ne!(pa.ciphertext, pb.ciphertext);
    }

    #[test]
    fn test_malformed_lengths() {
        let key = KeyMaterial::generate();
        for len in [0, 1, 56, 58, 72, MIN_TOKEN_SIZE + 15] {
            let token = vec![VERSION; len];
            assert!(
                matches!(open(&token, &key, 0, None), Err(SealError::MalformedToken)),
                "length {} should be malformed",
                len
            );
        }
    }

    #[test]
    fn test_minimum_length_token_fails_authentication() {
        let key = KeyMaterial::generate();
        let mut token = vec![0u8; MIN_TOKEN_SIZE];
        token[0] = VERSION;
        assert!(matches!(
            open(&token, &key, 0, None),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_unknown_version_rejected_before_mac() {
        let key = KeyMaterial::generate();
        let mut token = seal(b"payload", &key, 1);
        token[0] = 0x81;
        assert!(matches!(
            open(&token, &key, 1, None),
            Err(SealError::UnsupportedVersion(0x81))
        ));
    }

    #[test]
    fn test_every_byte_is_authenticated() {
        let key = KeyMaterial::generate();
        let token = seal(b"tamper target", &key, 100);

        for pos in 1..token.len() {
            let mut mutated = token.clone();
            mutated[pos] ^= 0x01;
            assert!(
                matches!(
                    open(&mutated, &key, 100, None),
                    Err(SealError::AuthenticationFailed)
                ),
                "flip at byte {} was not detected",
                pos
            );
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let key = KeyMaterial::generate();
        let ttl = Duration::from_secs(60);
        let token = seal(b"short lived", &key, 1000);

        assert!(open(&token, &key, 1060, Some(ttl)).is_ok());
        assert!(matches!(
            open(&token, &key, 1061, Some(ttl)),
            Err(SealError::TokenExpired)
        ));
        // No ttl means the timestamp is not consulted
        assert!(open(&token, &key, u64::MAX, None).is_ok());
    }

    #[test]
    fn test_future_timestamp_rejected_with_ttl() {
        let key = KeyMaterial::generate();
        let token = seal(b"from the future", &key, 2000);
        assert!(matches!(
            open(&token, &key, 1999, Some(Duration::from_secs(3600))),
            Err(SealError::TokenExpired)
        ));
    }

    #[test]
    fn test_expiry_checked_after_authentication() {
        let key = KeyMaterial::generate();
        let other = KeyMaterial::generate();
        let token = seal(b"old", &key, 10);
        // Both expired and wrong key: authentication wins
        assert!(matches!(
            open(&token, &other, 10_000, Some(Duration::from_secs(1))),
            Err(SealError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_invalid_padding_after_authentication() {
        let key = KeyMaterial::generate();

        // Last plaintext byte 0x00 is never valid padding
        let bad_block = Aes128CbcEnc::new(key.cipher_key().into(), &counting_iv().into())
            .encrypt_padded_vec_mut::<NoPadding>(&[0u8; BLOCK_SIZE]);
        let token = forge_authentic(&key, 0, &bad_block);
        assert!(matches!(
            open(&token, &key, 0, None),
            Err(SealError::InvalidPadding)
        ));

        let empty = forge_authentic(&key, 0, &[]);
        assert!(matches!(
            open(&empty, &key, 0, None),
            Err(SealError::InvalidPadding)
        ));
    }

    #[test]
    fn test_pad_unpad() {
        for len in 0..=48 {
            let data: Vec<u8> = (0..len as u8).collect();
            let padded = pad(&data);
            assert_eq!(padded.len() % BLOCK_SIZE, 0);
            assert!(padded.len() > data.len());
            assert!(padded.len() - data.len() <= BLOCK_SIZE);
            assert_eq!(unpad(padded).unwrap(), data);
        }
    }

    #[test]
    fn test_unpad_rejects_bad_padding() {
        let mut wrong_fill = vec![0xAA; 12];
        wrong_fill.extend_from_slice(&[3, 4, 4, 4]);
        assert!(matches!(unpad(wrong_fill), Err(SealError::InvalidPadding)));

        let mut too_long = vec![0u8; 15];
        too_long.push(17);
        assert!(matches!(unpad(too_long), Err(SealError::InvalidPadding)));

        assert!(matches!(unpad(Vec::new()), Err(SealError::InvalidPadding)));
    }

    #[test]
    fn test_transport_encoding() {
        let key = KeyMaterial::generate();
        let token = seal(b"transport", &key, 3);
        let text = encode_token(&token);
        assert!(!text.contains('\n'));
        assert!(!text.contains('+') && !text.contains('/'));
        assert_eq!(decode_token(&text).unwrap(), token);
        assert_eq!(decode_token(&format!("{}\n", text)).unwrap(), token);
        assert!(matches!(
            decode_token("***not a token***"),
            Err(SealError::MalformedToken)
        ));
    }
}
