//! SHA-256 digests as lowercase hex, used by the audit chain and for
//! refresh tokens at rest.

use sha2::{Digest, Sha256};

pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", Sha256::digest(data.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn str_and_bytes_agree() {
        let hash = sha256_hex("ORD-2026-000001");
        assert_eq!(hash, sha256_hex(b"ORD-2026-000001".as_slice()));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
