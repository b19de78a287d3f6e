//! Opaque refresh and reset tokens

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in an opaque token
const TOKEN_BYTES: usize = 32;

/// A raw token for the client together with the digest to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueToken {
    pub raw: String,
    pub hash: String,
}

/// Generate a random URL-safe token and its storage digest
pub fn generate_opaque_token() -> OpaqueToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_token(&raw);
    OpaqueToken { raw, hash }
}

/// Hex SHA-256 digest of a raw token
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
