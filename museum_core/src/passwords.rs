//! Password hashing and verification.
//!
//! Stored hashes are self-describing strings so that verification needs no
//! external configuration:
//!
//! - `bcrypt$<bcrypt hash>` (preferred, cost 12, needs the `bcrypt` feature)
//! - `pbkdf2$<iterations>$<base64 salt>$<base64 key>` (PBKDF2-HMAC-SHA256)
//!
//! Verification never errors. Anything it cannot parse, or a scheme this
//! build cannot compute, verifies as `false`.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::pbkdf2;
use std::num::NonZeroU32;

/// bcrypt work factor
pub const BCRYPT_COST: u32 = 12;

/// PBKDF2 iteration count for newly created hashes
pub const PBKDF2_ITERATIONS: u32 = 210_000;

pub const PBKDF2_SALT_LEN: usize = 16;
pub const PBKDF2_KEY_LEN: usize = 32;

/// Hashing scheme, identified by the prefix before the first `$`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashScheme {
    Bcrypt,
    Pbkdf2,
}

impl HashScheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            HashScheme::Bcrypt => "bcrypt",
            HashScheme::Pbkdf2 => "pbkdf2",
        }
    }

    /// The scheme new hashes use in this build
    pub fn preferred() -> Self {
        if cfg!(feature = "bcrypt") {
            HashScheme::Bcrypt
        } else {
            HashScheme::Pbkdf2
        }
    }

    /// Identify the scheme of a stored hash, if known
    pub fn of(stored: &str) -> Option<Self> {
        match stored.split_once('$')?.0 {
            "bcrypt" => Some(HashScheme::Bcrypt),
            "pbkdf2" => Some(HashScheme::Pbkdf2),
            _ => None,
        }
    }
}

/// Hash a password with the preferred scheme and a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with(HashScheme::preferred(), password)
}

/// Hash a password with an explicit scheme
pub fn hash_password_with(scheme: HashScheme, password: &str) -> Result<String> {
    match scheme {
        HashScheme::Bcrypt => hash_bcrypt(password),
        HashScheme::Pbkdf2 => Ok(hash_pbkdf2(password, PBKDF2_ITERATIONS)),
    }
}

/// Check a password against a stored hash in constant time
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some(("bcrypt", encoded)) => verify_bcrypt(password, encoded),
        Some(("pbkdf2", fields)) => verify_pbkdf2(password, fields).unwrap_or_else(|| {
            tracing::warn!("Malformed pbkdf2 password hash");
            false
        }),
        _ => {
            tracing::warn!("Unrecognised password hash scheme");
            false
        }
    }
}

#[cfg(feature = "bcrypt")]
fn hash_bcrypt(password: &str) -> Result<String> {
    let hashed =
        bcrypt::hash(password, BCRYPT_COST).map_err(|e| Error::Hashing(e.to_string()))?;
    Ok(format!("{}${}", HashScheme::Bcrypt.prefix(), hashed))
}

#[cfg(not(feature = "bcrypt"))]
fn hash_bcrypt(_password: &str) -> Result<String> {
    Err(Error::Hashing(
        "bcrypt support is not compiled into this build".into(),
    ))
}

#[cfg(feature = "bcrypt")]
fn verify_bcrypt(password: &str, encoded: &str) -> bool {
    // bcrypt compares digests with subtle::ConstantTimeEq.
    bcrypt::verify(password, encoded).unwrap_or(false)
}

#[cfg(not(feature = "bcrypt"))]
fn verify_bcrypt(_password: &str, _encoded: &str) -> bool {
    tracing::warn!("bcrypt password hash found but bcrypt support is not compiled in");
    false
}

fn hash_pbkdf2(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; PBKDF2_SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = [0u8; PBKDF2_KEY_LEN];
    derive_pbkdf2(iterations_nonzero(iterations), &salt, password, &mut key);

    format!(
        "{}${}${}${}",
        HashScheme::Pbkdf2.prefix(),
        iterations,
        BASE64_STANDARD.encode(salt),
        BASE64_STANDARD.encode(key)
    )
}

/// Parse `<iterations>$<salt>$<key>` and recompute. None means malformed.
fn verify_pbkdf2(password: &str, fields: &str) -> Option<bool> {
    let mut parts = fields.split('$');
    let iterations = NonZeroU32::new(parts.next()?.parse().ok()?)?;
    let salt = BASE64_STANDARD.decode(parts.next()?).ok()?;
    let expected = BASE64_STANDARD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || salt.is_empty() || expected.is_empty() {
        return None;
    }

    let mut derived = vec![0u8; expected.len()];
    derive_pbkdf2(iterations, &salt, password, &mut derived);
    Some(constant_time_eq::constant_time_eq(&derived, &expected))
}

fn derive_pbkdf2(iterations: NonZeroU32, salt: &[u8], password: &str, out: &mut [u8]) {
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        out,
    );
}

fn iterations_nonzero(iterations: u32) -> NonZeroU32 {
    NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_roundtrip() {
        let hash = hash_password_with(HashScheme::Pbkdf2, "s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash));
        assert!(!verify_password("s3cret?", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_pbkdf2_format() {
        let hash = hash_password_with(HashScheme::Pbkdf2, "pw").unwrap();
        let parts: Vec<&str> = hash.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2");
        assert_eq!(parts[1], "210000");
        assert_eq!(BASE64_STANDARD.decode(parts[2]).unwrap().len(), PBKDF2_SALT_LEN);
        assert_eq!(BASE64_STANDARD.decode(parts[3]).unwrap().len(), PBKDF2_KEY_LEN);
        assert_eq!(HashScheme::of(&hash), Some(HashScheme::Pbkdf2));
    }

    #[test]
    fn test_fresh_salt_every_call() {
        let a = hash_password_with(HashScheme::Pbkdf2, "same").unwrap();
        let b = hash_password_with(HashScheme::Pbkdf2, "same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_verifies_with_stored_iteration_count() {
        // A low-cost hash made elsewhere must still verify; parameters come from the string.
        let hash = hash_pbkdf2("legacy", 1_000);
        assert!(hash.starts_with("pbkdf2$1000$"));
        assert!(verify_password("legacy", &hash));
    }

    #[test]
    fn test_malformed_hashes_fail_closed() {
        let cases = [
            "",
            "garbage$not-a-real-hash",
            "no-dollar-sign",
            "pbkdf2$",
            "pbkdf2$abc$c2FsdA==$a2V5",
            "pbkdf2$0$c2FsdA==$a2V5",
            "pbkdf2$1000$!!!$a2V5",
            "pbkdf2$1000$c2FsdA==",
            "pbkdf2$1000$$a2V5",
            "pbkdf2$1000$c2FsdA==$",
            "pbkdf2$1000$c2FsdA==$a2V5$extra",
            "bcrypt$not-bcrypt",
            "md5$abc",
        ];
        for case in cases {
            assert!(!verify_password("anything", case), "accepted {:?}", case);
        }
    }

    #[cfg(feature = "bcrypt")]
    #[test]
    fn test_bcrypt_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("bcrypt$$2"));
        assert_eq!(HashScheme::of(&hash), Some(HashScheme::Bcrypt));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[cfg(not(feature = "bcrypt"))]
    #[test]
    fn test_fallback_scheme_without_bcrypt() {
        let hash = hash_password("pw").unwrap();
        assert!(hash.starts_with("pbkdf2$"));
        assert!(!verify_password(
            "pw",
            "bcrypt$$2b$12$abcdefghijklmnopqrstuuAbCdEfGhIjKlMnOpQrStUvWxYz01234"
        ));
    }
}
