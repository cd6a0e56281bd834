//! Threshold secret sharing over GF(2^8)
//!
//! Every byte of the secret is the constant term of its own random
//! polynomial of degree `threshold - 1`. Share `x` carries the evaluation
//! of each of those polynomials at `x`, so a share is exactly as long as
//! the secret. Any `threshold` shares recover the secret by Lagrange
//! interpolation at `x = 0`.
//!
//! There is no integrity check in the scheme itself: combining too few
//! shares returns a wrong secret rather than an error. Callers detect that
//! downstream (the AEAD tag of whatever the secret was protecting).

use std::collections::BTreeMap;

use rand::RngCore;
use zeroize::Zeroize;

/// Shares keyed by their evaluation point (1..=255)
pub type ShareMap = BTreeMap<u8, Vec<u8>>;

/// Largest number of shares the field allows (x = 0 is the secret)
pub const MAX_SHARES: usize = 255;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SharingError {
    #[error("invalid threshold {threshold} for {total} parts (need 1 <= threshold <= total <= 255)")]
    InvalidParameters { total: usize, threshold: usize },
    #[error("no shares supplied")]
    NoShares,
    #[error("share index 0 is reserved for the secret")]
    ZeroIndex,
    #[error("share {index} is {len} bytes, expected {expected}")]
    LengthMismatch {
        index: u8,
        len: usize,
        expected: usize,
    },
}

const fn build_tables() -> ([u8; 256], [u8; 256]) {
    let mut exp = [0u8; 256];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        // multiply by the generator 0x03 modulo x^8 + x^4 + x^3 + x + 1
        let mut doubled = x << 1;
        if doubled & 0x100 != 0 {
            doubled ^= 0x11b;
        }
        x = doubled ^ x;
        i += 1;
    }
    exp[255] = exp[0];
    (exp, log)
}

const TABLES: ([u8; 256], [u8; 256]) = build_tables();
const EXP: [u8; 256] = TABLES.0;
const LOG: [u8; 256] = TABLES.1;

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let sum = (LOG[a as usize] as usize + LOG[b as usize] as usize) % 255;
    EXP[sum]
}

fn gf_div(a: u8, b: u8) -> u8 {
    debug_assert!(b != 0, "division by zero in GF(256)");
    if a == 0 {
        return 0;
    }
    let diff = (LOG[a as usize] as usize + 255 - LOG[b as usize] as usize) % 255;
    EXP[diff]
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf_mul(acc, x) ^ c)
}

/// Split `secret` into `total` shares, any `threshold` of which rebuild it.
pub fn split(secret: &[u8], total: usize, threshold: usize) -> Result<ShareMap, SharingError> {
    if threshold == 0 || threshold > total || total > MAX_SHARES {
        return Err(SharingError::InvalidParameters { total, threshold });
    }

    let mut rng = rand::rng();
    let mut shares: ShareMap = (1..=total as u8)
        .map(|x| (x, Vec::with_capacity(secret.len())))
        .collect();

    let mut coefficients = vec![0u8; threshold];
    for &byte in secret {
        coefficients[0] = byte;
        rng.fill_bytes(&mut coefficients[1..]);
        for (x, share) in shares.iter_mut() {
            share.push(evaluate(&coefficients, *x));
        }
    }

    coefficients.zeroize();
    Ok(shares)
}

/// Rebuild a secret from a set of shares.
///
/// All supplied shares take part in the interpolation. Supplying fewer
/// than the split threshold yields an unrelated secret, not an error.
pub fn combine(shares: &ShareMap) -> Result<Vec<u8>, SharingError> {
    let expected = shares
        .values()
        .next()
        .map(Vec::len)
        .ok_or(SharingError::NoShares)?;

    for (&index, share) in shares {
        if index == 0 {
            return Err(SharingError::ZeroIndex);
        }
        if share.len() != expected {
            return Err(SharingError::LengthMismatch {
                index,
                len: share.len(),
                expected,
            });
        }
    }

    // Lagrange basis at x = 0: l_i = prod_{j != i} x_j / (x_j - x_i),
    // and subtraction is xor in characteristic 2.
    let basis: Vec<(u8, &Vec<u8>)> = shares
        .iter()
        .map(|(&xi, share)| {
            let weight = shares.keys().filter(|&&xj| xj != xi).fold(1u8, |acc, &xj| {
                gf_mul(acc, gf_div(xj, xj ^ xi))
            });
            (weight, share)
        })
        .collect();

    let secret = (0..expected)
        .map(|position| {
            basis
                .iter()
                .fold(0u8, |acc, (weight, share)| acc ^ gf_mul(*weight, share[position]))
        })
        .collect();

    Ok(secret)
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn subset(shares: &ShareMap, indices: &[u8]) -> ShareMap {
        indices
            .iter()
            .map(|i| (*i, shares[i].clone()))
            .collect()
    }

    #[test]
    fn test_field_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gf_mul(a, gf_div(1, a)), 1, "inverse of {}", a);
        }
    }

    #[test]
    fn test_field_mul_known_value() {
        // FIPS-197 worked example: {57} x {83} = {c1}
        assert_eq!(gf_mul(0x57, 0x83), 0xc1);
    }

    #[test]
    fn test_split_combine_any_threshold_subset() {
        let secret = b"a secret worth splitting".to_vec();
        let shares = split(&secret, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);

        for indices in [[1, 2, 3], [1, 3, 5], [2, 4, 5], [3, 4, 5]] {
            assert_eq!(combine(&subset(&shares, &indices)).unwrap(), secret);
        }
        assert_eq!(combine(&shares).unwrap(), secret);
    }

    #[test]
    fn test_too_few_shares_yield_wrong_secret() {
        let secret = [0x42u8; 32].to_vec();
        let shares = split(&secret, 5, 3).unwrap();
        let recovered = combine(&subset(&shares, &[1, 2])).unwrap();
        assert_ne!(recovered, secret);
    }

    #[test]
    fn test_threshold_one_shares_equal_secret() {
        let shares = split(b"xyz", 3, 1).unwrap();
        for share in shares.values() {
            assert_eq!(share, b"xyz");
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            split(b"s", 3, 0),
            Err(SharingError::InvalidParameters { .. })
        ));
        assert!(matches!(
            split(b"s", 2, 3),
            Err(SharingError::InvalidParameters { .. })
        ));
        assert!(matches!(
            split(b"s", 256, 2),
            Err(SharingError::InvalidParameters { .. })
        ));
        assert_eq!(split(b"s", 255, 255).unwrap().len(), 255);
    }

    #[test]
    fn test_combine_rejects_malformed_sets() {
        assert_eq!(combine(&ShareMap::new()), Err(SharingError::NoShares));

        let zero = ShareMap::from([(0, vec![1]), (1, vec![2])]);
        assert_eq!(combine(&zero), Err(SharingError::ZeroIndex));

        let uneven = ShareMap::from([(1, vec![1, 2]), (2, vec![3])]);
        assert!(matches!(
            combine(&uneven),
            Err(SharingError::LengthMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn test_empty_secret() {
        let shares = split(b"", 4, 2).unwrap();
        assert!(shares.values().all(Vec::is_empty));
        assert_eq!(combine(&shares).unwrap(), Vec::<u8>::new());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_threshold_subset_recovers_secret(
            secret in proptest::collection::vec(any::<u8>(), 0..48),
            total in 1usize..=12,
            threshold_seed in any::<usize>(),
            pick_seed in any::<u64>(),
        ) {
            let threshold = threshold_seed % total + 1;
            let shares = split(&secret, total, threshold).unwrap();

            // rotate through the indices to pick a deterministic M-subset
            let start = (pick_seed % total as u64) as usize;
            let picked: Vec<u8> = (0..threshold)
                .map(|k| ((start + k) % total + 1) as u8)
                .collect();

            prop_assert_eq!(combine(&subset(&shares, &picked)).unwrap(), secret);
        }
    }
}
