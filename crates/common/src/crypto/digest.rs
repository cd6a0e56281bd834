//! Integrity digests over stored (encrypted) bytes
//!
//! Digests are always taken over ciphertext, so anyone holding the
//! manifest can check what the store handed back without holding the key.

use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq;

/// Size of a SHA-256 digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Lower-case hex SHA-256 of `data`.
pub fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against a hex digest.
///
/// Upper- and lower-case hex are both accepted; anything that does not
/// decode to a digest-sized value fails validation. The comparison itself
/// runs in constant time.
pub fn validate(data: &[u8], expected: &str) -> bool {
    let mut expected_bytes = [0u8; DIGEST_SIZE];
    if hex::decode_to_slice(expected.trim(), &mut expected_bytes).is_err() {
        return false;
    }
    let actual = Sha256::digest(data);
    actual.as_slice().ct_eq(&expected_bytes).into()
}
