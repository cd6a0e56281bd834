//! Cryptographic primitives for sealbox
//!
//! - **Content encryption**: ChaCha20-Poly1305 [`Secret`] with a self-describing
//!   `nonce || ciphertext || tag` framing
//! - **Identity & agreement**: Ed25519 keypairs, converted to X25519 for
//!   shared-key derivation and used directly to sign ledger anchors
//! - **Threshold sharing**: byte-wise Shamir sharing over GF(256) in [`sharing`]
//! - **Integrity**: SHA-256 digests over ciphertext in [`digest`]
//!
//! Everything here is stateless; the privacy strategies compose these
//! pieces and the orchestrators never touch them directly.

pub mod digest;
mod keys;
mod secret;
pub mod sharing;

pub use keys::{KeyError, PublicKey, SecretKey, Signature, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use secret::{Secret, SecretError, BLAKE3_HASH_SIZE, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
pub use sharing::{ShareMap, SharingError};
