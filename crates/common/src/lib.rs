/**
 * DAG-CBOR block encoding shared by the manifest
 *  and ledger records.
 */
pub mod codec;
/**
 * Cryptographic types and operations.
 *  - Content key encryption
 *  - Ed25519 identities and X25519 agreement
 *  - Threshold secret sharing
 *  - Ciphertext digests
 */
pub mod crypto;
/**
 * Fetching, verifying and decrypting an upload
 *  from its root hash or ledger transaction.
 */
pub mod download;
/**
 * Anchoring root hashes into signed, resolvable
 *  ledger records.
 */
pub mod ledger;
/**
 * The root manifest tying an upload's items
 *  together.
 */
pub mod manifest;
/**
 * Pluggable privacy strategies: plain, password,
 *  shared key and threshold shared.
 */
pub mod privacy;
/**
 * Content-addressed storage layer.
 *  Just a light wrapper around an Iroh-Blobs
 *  store, in memory or on disk.
 */
pub mod store;
/**
 * Encrypting, storing and anchoring a list
 *  of data items as one upload.
 */
pub mod upload;

pub mod prelude {
    pub use crate::crypto::{PublicKey, SecretKey, ShareMap};
    pub use crate::download::{
        DownloadError, DownloadParams, DownloadResult, DownloadTarget, Downloader, ItemError,
        ItemSelector,
    };
    pub use crate::ledger::{FsLedger, Ledger, MemoryLedger, TransactionRef};
    pub use crate::manifest::{ManifestEntry, RootManifest, StoreType};
    pub use crate::privacy::{PrivacyError, PrivacyStrategy, PrivacyType};
    pub use crate::store::{BlobsStore, ContentHash, Store};
    pub use crate::upload::{DataItem, UploadError, UploadParams, UploadResult, Uploader};
}
