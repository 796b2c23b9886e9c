//! Random tokens for email verification, password reset and share codes

use rand::RngCore;
use rand::rngs::OsRng;

/// `len` random bytes from the OS generator, hex encoded
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 64-character token for verification and reset links
pub fn generate_token() -> String {
    random_hex(32)
}
