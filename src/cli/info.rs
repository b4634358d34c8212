use crate::error::{Result, SealError};
use crate::token::{decode_token, TokenParts, BLOCK_SIZE, VERSION};
use std::fs;
use std::path::Path;

/// Describe the structure of a sealed file. No key is involved, so nothing
/// reported here has been authenticated.
pub fn show_info(path: &Path) -> Result<String> {
    let raw = fs::read(path)?;
    let text = std::str::from_utf8(&raw).map_err(|_| SealError::MalformedToken)?;
    let token = decode_token(text)?;
    let parts = TokenParts::parse(&token)?;

    let blocks = parts.ciphertext.len() / BLOCK_SIZE;
    let max_plaintext = parts.ciphertext.len().saturating_sub(1);
    let version_note = if parts.version == VERSION {
        ""
    } else {
        " (unsupported)"
    };

    let mut output = String::new();

    output.push_str("Sealed File Information\n");
    output.push_str("=======================\n\n");

    output.push_str(&format!("File: {}\n", path.display()));
    output.push_str(&format!("Encoded size: {}\n", format_size(raw.len() as u64)));
    output.push_str(&format!("Token size: {}\n", format_size(token.len() as u64)));
    output.push('\n');

    output.push_str("Token Layout:\n");
    output.push_str(&format!("  Version: 0x{:02x}{}\n", parts.version, version_note));
    output.push_str(&format!("  Timestamp: {} (seconds since epoch)\n", parts.timestamp));
    output.push_str(&format!("  IV: {}\n", hex::encode(parts.iv)));
    output.push_str(&format!(
        "  Ciphertext: {} bytes ({} blocks)\n",
        parts.ciphertext.len(),
        blocks
    ));
    output.push_str(&format!("  Tag: {}\n", hex::encode(parts.tag)));
    output.push_str(&format!(
        "  Plaintext size: {} to {} bytes\n",
        max_plaintext.saturating_sub(BLOCK_SIZE - 1),
        max_plaintext
    ));
    output.push('\n');

    output.push_str("Algorithms:\n");
    output.push_str("  Cipher: AES-128-CBC\n");
    output.push_str("  MAC: HMAC-SHA256\n");
    output.push('\n');

    output.push_str("Security Model:\n");
    output.push_str("  The tag has not been verified.\n");
    output.push_str("  Decrypt with the key to authenticate the contents.\n");

    Ok(output)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
