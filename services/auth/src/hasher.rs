//! Station secret hashing
//!
//! New hashes are `scrypt$N$r$p$salt_b64$digest_hex`. Records created by the
//! previous generation of the registration app hold bcrypt hashes (`$2a$`,
//! `$2b$`, `$2y$`); those still verify but are never produced. Scheme detection
//! happens once, in [`StoredSecret::parse`].

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

const SCRYPT_TAG: &str = "scrypt";
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// scrypt cost parameter N
pub const SCRYPT_N: u64 = 16_384;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;
pub const SALT_LEN: usize = 16;
pub const DIGEST_LEN: usize = 64;

/// Well-formed record that matches no secret
///
/// Verified in place of a missing station's hash so unknown codes cost the
/// same scrypt work as known ones.
pub const DECOY_HASH: &str = "scrypt$16384$8$1$dHVybnN0aWxlLWRlY295$\
    00000000000000000000000000000000000000000000000000000000000000000000000000000000\
    000000000000000000000000000000000000000000000000";

// Bounds on cost parameters and digest length accepted from stored records.
const MAX_LOG_N: u8 = 20;
const MAX_R: u32 = 32;
const MAX_P: u32 = 16;
const MIN_DIGEST_LEN: usize = 16;
const MAX_DIGEST_LEN: usize = 128;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("invalid scrypt parameters: {0}")]
    Params(String),
    #[error("key derivation failed: {0}")]
    Derive(String),
}

/// A parsed stored hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSecret {
    Scrypt {
        log_n: u8,
        r: u32,
        p: u32,
        salt: Vec<u8>,
        digest: Vec<u8>,
    },
    Bcrypt(String),
}

impl StoredSecret {
    /// Parse a stored hash string; `None` when it is not a recognised format
    pub fn parse(stored: &str) -> Option<Self> {
        let stored = stored.trim();

        if BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix)) {
            return Some(StoredSecret::Bcrypt(stored.to_string()));
        }

        let fields: Vec<&str> = stored.split('$').collect();
        let [tag, n, r, p, salt, digest] = fields.as_slice() else {
            return None;
        };
        if *tag != SCRYPT_TAG {
            return None;
        }

        let n: u64 = n.parse().ok()?;
        if n < 2 || !n.is_power_of_two() {
            return None;
        }
        let log_n = u8::try_from(n.trailing_zeros()).ok()?;
        if log_n > MAX_LOG_N {
            return None;
        }

        let r: u32 = r.parse().ok()?;
        let p: u32 = p.parse().ok()?;
        if !(1..=MAX_R).contains(&r) || !(1..=MAX_P).contains(&p) {
            return None;
        }

        let salt = decode_salt(salt)?;
        let digest = hex::decode(digest).ok()?;
        if salt.is_empty() || !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&digest.len()) {
            return None;
        }

        Some(StoredSecret::Scrypt {
            log_n,
            r,
            p,
            salt,
            digest,
        })
    }

    /// Check a candidate secret against this hash
    pub fn verify(&self, secret: &str) -> bool {
        match self {
            StoredSecret::Bcrypt(hash) => bcrypt::verify(secret, hash).unwrap_or(false),
            StoredSecret::Scrypt {
                log_n,
                r,
                p,
                salt,
                digest,
            } => match derive(secret.as_bytes(), salt, *log_n, *r, *p, digest.len()) {
                Ok(derived) => derived.len() == digest.len() && bool::from(derived.ct_eq(digest)),
                Err(e) => {
                    debug!("Stored scrypt hash rejected: {}", e);
                    false
                }
            },
        }
    }
}

/// Hash a secret with a fresh random salt
pub fn hash_secret(secret: &str) -> Result<String, HashError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let log_n = SCRYPT_N.trailing_zeros() as u8;
    let digest = derive(secret.as_bytes(), &salt, log_n, SCRYPT_R, SCRYPT_P, DIGEST_LEN)?;

    Ok(format!(
        "{}${}${}${}${}${}",
        SCRYPT_TAG,
        SCRYPT_N,
        SCRYPT_R,
        SCRYPT_P,
        URL_SAFE_NO_PAD.encode(salt),
        hex::encode(digest)
    ))
}

/// Verify a secret against a stored hash string
///
/// Malformed or unrecognised stored values verify as `false`.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    match StoredSecret::parse(stored) {
        Some(parsed) => parsed.verify(secret),
        None => {
            debug!("Stored secret hash has an unrecognised format");
            false
        }
    }
}

// Salts are written URL-safe by this crate; older records use standard base64.
fn decode_salt(encoded: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD.decode(encoded))
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .ok()
}

fn derive(
    secret: &[u8],
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
    len: usize,
) -> Result<Vec<u8>, HashError> {
    // Params only records `len` for PHC strings; the output buffer sets the length here.
    let params = scrypt::Params::new(log_n, r, p, scrypt::Params::RECOMMENDED_LEN)
        .map_err(|e| HashError::Params(e.to_string()))?;
    let mut output = vec![0u8; len];
    scrypt::scrypt(secret, salt, &params, &mut output)
        .map_err(|e| HashError::Derive(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_format() {
        let hash = hash_secret("door-7-secret").expect("hash");
        let fields: Vec<&str> = hash.split('$').collect();

        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "scrypt");
        assert_eq!(fields[1], "16384");
        assert_eq!(fields[2], "8");
        assert_eq!(fields[3], "1");
        assert_eq!(URL_SAFE_NO_PAD.decode(fields[4]).expect("salt").len(), SALT_LEN);
        assert_eq!(fields[5].len(), DIGEST_LEN * 2);
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_secret("door-7-secret").expect("hash");

        assert!(verify_secret("door-7-secret", &hash));
        assert!(!verify_secret("door-7-secreT", &hash));
        assert!(!verify_secret("", &hash));
    }

    #[test]
    fn test_fresh_salt_per_hash() {
        let first = hash_secret("same").expect("hash");
        let second = hash_secret("same").expect("hash");

        assert_ne!(first, second);
        assert!(verify_secret("same", &first));
        assert!(verify_secret("same", &second));
    }

    #[test]
    fn test_bcrypt_marker_routes_to_legacy_verification() {
        let legacy = bcrypt::hash("legacy-pin", 4).expect("bcrypt hash");

        assert!(matches!(
            StoredSecret::parse(&legacy),
            Some(StoredSecret::Bcrypt(_))
        ));
        assert!(verify_secret("legacy-pin", &legacy));
        assert!(!verify_secret("wrong-pin", &legacy));
    }

    #[test]
    fn test_hand_crafted_bcrypt_marker_fails_without_panicking() {
        let crafted = "$2b$10$thisisnotarealbcrypthashatall";

        assert!(matches!(
            StoredSecret::parse(crafted),
            Some(StoredSecret::Bcrypt(_))
        ));
        assert!(!verify_secret("anything", crafted));
    }

    #[test]
    fn test_malformed_stored_hashes_fail_verification() {
        let good = hash_secret("pin").expect("hash");
        let without_digest = good.rsplit_once('$').expect("fields").0.to_string();

        for stored in [
            "",
            "plaintext",
            without_digest.as_str(),
            "scrypt$16384$8$1$c2FsdA",
            "scrypt$16384$8$1$c2FsdA$zz$extra",
            "scrypt$16385$8$1$c2FsdA$00",
            "scrypt$abc$8$1$c2FsdA$00",
            "scrypt$16384$8$1$!!!$00",
            "scrypt$16384$8$1$c2FsdA$not-hex",
            "argon2$16384$8$1$c2FsdA$00",
            "scrypt$16384$0$1$c2FsdA$00",
        ] {
            assert!(!verify_secret("pin", stored), "{stored:?} verified");
        }
    }

    fn record(salt_field: &str, salt: &[u8], secret: &str, digest_len: usize) -> String {
        let log_n = SCRYPT_N.trailing_zeros() as u8;
        let digest =
            derive(secret.as_bytes(), salt, log_n, SCRYPT_R, SCRYPT_P, digest_len).expect("derive");
        format!(
            "scrypt${}${}${}${}${}",
            SCRYPT_N,
            SCRYPT_R,
            SCRYPT_P,
            salt_field,
            hex::encode(digest)
        )
    }

    #[test]
    fn test_decoy_hash_matches_default_cost() {
        let Some(StoredSecret::Scrypt {
            log_n,
            r,
            p,
            digest,
            ..
        }) = StoredSecret::parse(DECOY_HASH)
        else {
            panic!("decoy hash should parse as scrypt");
        };

        assert_eq!(1u64 << log_n, SCRYPT_N);
        assert_eq!((r, p), (SCRYPT_R, SCRYPT_P));
        assert_eq!(digest.len(), DIGEST_LEN);
        assert!(!verify_secret("", DECOY_HASH));
        assert!(!verify_secret("door-7-secret", DECOY_HASH));
    }

    #[test]
    fn test_standard_base64_salt_verifies() {
        let salt = [0xfb_u8; SALT_LEN];
        let padded = STANDARD.encode(salt);
        assert!(padded.contains('+') || padded.contains('/'));
        assert!(padded.ends_with('='));

        let stored = record(&padded, &salt, "door-7-secret", DIGEST_LEN);
        assert!(verify_secret("door-7-secret", &stored));
        assert!(!verify_secret("door-7-secreT", &stored));

        let unpadded = record(&STANDARD_NO_PAD.encode(salt), &salt, "door-7-secret", DIGEST_LEN);
        assert!(verify_secret("door-7-secret", &unpadded));
    }

    #[test]
    fn test_digest_length_follows_stored_record() {
        let salt = [7u8; SALT_LEN];
        let stored = record(&URL_SAFE_NO_PAD.encode(salt), &salt, "pin", 32);

        assert!(verify_secret("pin", &stored));
        assert!(!verify_secret("pun", &stored));
    }

    #[test]
    fn test_digest_length_out_of_bounds_is_rejected() {
        let salt = [7u8; SALT_LEN];
        let short = record(&URL_SAFE_NO_PAD.encode(salt), &salt, "pin", MIN_DIGEST_LEN - 1);
        let long = record(&URL_SAFE_NO_PAD.encode(salt), &salt, "pin", MAX_DIGEST_LEN + 1);

        assert_eq!(StoredSecret::parse(&short), None);
        assert_eq!(StoredSecret::parse(&long), None);
        assert!(!verify_secret("pin", &short));
    }

    #[test]
    fn test_excessive_cost_parameters_are_rejected() {
        let digest = "00".repeat(DIGEST_LEN);
        for (r, p) in [(8, 1_000_000), (8, MAX_P + 1), (MAX_R + 1, 1), (8, 0)] {
            let stored = format!("scrypt$16384${}${}$c2FsdHNhbHQ${}", r, p, digest);
            assert_eq!(StoredSecret::parse(&stored), None, "r={r} p={p}");
        }

        let stored = format!("scrypt$16384$8${}$c2FsdHNhbHQ${}", MAX_P, digest);
        assert!(StoredSecret::parse(&stored).is_some());
    }
}
