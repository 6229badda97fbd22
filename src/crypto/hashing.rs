// Content-addressed hashing for certificate documents.

use primitive_types::H256;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Length of the canonical hash representation: "0x" + 64 hex chars.
pub const CONTENT_HASH_LEN: usize = 66;

const READ_CHUNK_BYTES: usize = 8192;

/// Hashes a file's exact byte content into a H256 digest, streaming in
/// fixed-size chunks so memory use stays bounded regardless of file size.
///
/// The digest depends only on the bytes; filename and timing are irrelevant.
/// An I/O error while reading is propagated; no partial digest is returned.
pub async fn hash_file(path: &Path) -> anyhow::Result<H256> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(H256::from_slice(&hasher.finalize()))
}

/// Hashes an in-memory byte slice. Same digest as `hash_file` over identical content.
pub fn hash_bytes(bytes: &[u8]) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    H256::from_slice(&hasher.finalize())
}

/// Canonical form of a content hash: lowercase hex with a `0x` prefix (66 chars).
pub fn canonical_hex(hash: H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// Parses a content hash from user input. Accepts an optional `0x` prefix and
/// mixed case; rejects anything that is not exactly 32 bytes of hex.
pub fn parse_content_hash(s: &str) -> Result<H256, String> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(s).map_err(|_| "invalid hex".to_string())?;
    if bytes.len() != 32 {
        return Err("expected 32-byte hex string".to_string());
    }
    Ok(H256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_digest_matches_in_memory_digest() -> anyhow::Result<()> {
        // Content larger than one read chunk so streaming actually iterates.
        let content: Vec<u8> = (0..3 * READ_CHUNK_BYTES + 17).map(|i| (i % 251) as u8).collect();

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("doc.pdf");
        std::fs::File::create(&path)?.write_all(&content)?;

        assert_eq!(hash_file(&path).await?, hash_bytes(&content));
        Ok(())
    }

    #[tokio::test]
    async fn digest_is_independent_of_filename() -> anyhow::Result<()> {
        let content = b"identical certificate bytes";
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("first.pdf");
        let b = dir.path().join("completely_different_name.pdf");
        std::fs::write(&a, content)?;
        std::fs::write(&b, content)?;

        assert_eq!(hash_file(&a).await?, hash_file(&b).await?);
        Ok(())
    }

    #[test]
    fn canonical_form_is_prefixed_lowercase_and_66_chars() {
        let h = hash_bytes(b"x");
        let canonical = canonical_hex(h);
        assert_eq!(canonical.len(), CONTENT_HASH_LEN);
        assert!(canonical.starts_with("0x"));
        assert_eq!(canonical, canonical.to_lowercase());
    }

    #[test]
    fn parse_accepts_prefixed_and_bare_mixed_case() {
        let h = hash_bytes(b"y");
        let canonical = canonical_hex(h);
        assert_eq!(parse_content_hash(&canonical).unwrap(), h);
        assert_eq!(parse_content_hash(canonical.trim_start_matches("0x")).unwrap(), h);
        assert_eq!(parse_content_hash(&canonical.to_uppercase()).unwrap(), h);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_content_hash("0xzz").is_err());
        assert!(parse_content_hash("0x1234").is_err());
        assert!(parse_content_hash("").is_err());
    }
}
