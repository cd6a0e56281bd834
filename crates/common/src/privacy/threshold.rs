use crate::crypto::{sharing, Secret, ShareMap, SECRET_SIZE};

use super::PrivacyError;

/// Encryption under a content key held as Shamir shares
///
/// The key is never stored. On the way in it is generated fresh and split
/// into `total_parts` shares; on the way out at least `threshold` of them
/// must be supplied to rebuild it.
#[derive(Clone)]
pub struct ThresholdSharedStrategy {
    total_parts: usize,
    threshold: usize,
    shares: ShareMap,
}

impl std::fmt::Debug for ThresholdSharedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdSharedStrategy")
            .field("total_parts", &self.total_parts)
            .field("threshold", &self.threshold)
            .field("indices", &self.shares.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ThresholdSharedStrategy {
    /// Wrap a set of held shares.
    ///
    /// Holding fewer than `threshold` shares is allowed here and only
    /// fails once a key is needed.
    pub fn new(total_parts: usize, threshold: usize, shares: ShareMap) -> Result<Self, PrivacyError> {
        validate_parameters(total_parts, threshold)?;
        for (&index, share) in &shares {
            if index == 0 || index as usize > total_parts {
                return Err(PrivacyError::Validation(format!(
                    "share index {} outside 1..={}",
                    index, total_parts
                )));
            }
            if share.len() != SECRET_SIZE {
                return Err(PrivacyError::Validation(format!(
                    "share {} is {} bytes, expected {}",
                    index,
                    share.len(),
                    SECRET_SIZE
                )));
            }
        }
        Ok(Self {
            total_parts,
            threshold,
            shares,
        })
    }

    /// Draw a fresh content key, split it, and return a strategy holding
    /// every share alongside a copy of the full share map to distribute.
    pub fn generate(total_parts: usize, threshold: usize) -> Result<(Self, ShareMap), PrivacyError> {
        validate_parameters(total_parts, threshold)?;
        let secret = Secret::generate().map_err(PrivacyError::Encryption)?;
        let shares = sharing::split(secret.bytes(), total_parts, threshold)
            .map_err(|e| PrivacyError::Validation(e.to_string()))?;
        let strategy = Self::new(total_parts, threshold, shares.clone())?;
        Ok((strategy, shares))
    }

    /// Encrypt `data` under a brand-new key and hand back its shares.
    ///
    /// The held shares of `self` are not used; only its parameters are.
    pub fn seal(&self, data: &[u8]) -> Result<(Vec<u8>, ShareMap), PrivacyError> {
        let (fresh, shares) = Self::generate(self.total_parts, self.threshold)?;
        let ciphertext = fresh.encrypt(data)?;
        Ok((ciphertext, shares))
    }

    pub fn total_parts(&self) -> usize {
        self.total_parts
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn shares(&self) -> &ShareMap {
        &self.shares
    }

    fn key(&self) -> Result<Secret, PrivacyError> {
        if self.shares.len() < self.threshold {
            return Err(PrivacyError::InsufficientShares {
                required: self.threshold,
                supplied: self.shares.len(),
            });
        }
        let mut bytes = sharing::combine(&self.shares)
            .map_err(|e| PrivacyError::Validation(e.to_string()))?;
        let secret = Secret::from_slice(&bytes).map_err(PrivacyError::Decryption);
        zeroize::Zeroize::zeroize(&mut bytes);
        secret
    }

    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        self.key()?.encrypt(data).map_err(PrivacyError::Encryption)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, PrivacyError> {
        self.key()?.decrypt(data).map_err(PrivacyError::Decryption)
    }
}

fn validate_parameters(total_parts: usize, threshold: usize) -> Result<(), PrivacyError> {
    if threshold == 0 || threshold > total_parts || total_parts > sharing::MAX_SHARES {
        return Err(PrivacyError::Validation(format!(
            "threshold {} of {} parts is not satisfiable (need 1 <= threshold <= parts <= {})",
            threshold,
            total_parts,
            sharing::MAX_SHARES
        )));
    }
    Ok(())
}
