//! Passcode digest and challenge generation
//!
//! The passcode is never stored. Enrollment keeps an Argon2id PHC string
//! (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`); verification re-derives with
//! the parameters and salt embedded in that string, so the digest is
//! deterministic for a given salt and older cost settings keep verifying
//! after the defaults change.

use crate::config::PasscodeKdfParams;
use crate::{Error, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of platform challenges in bytes
pub const CHALLENGE_LEN: usize = 32;

/// Check that `passcode` is exactly `length` ASCII digits
pub fn validate_passcode(passcode: &str, length: usize) -> Result<()> {
    if passcode.len() != length {
        return Err(Error::InvalidPasscode(format!(
            "Passcode must be {} digits",
            length
        )));
    }
    if !passcode.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidPasscode(
            "Passcode must contain only digits".to_string(),
        ));
    }
    Ok(())
}

/// One-way passcode digest
#[derive(Clone, PartialEq, Eq)]
pub struct PasscodeDigest {
    hash: String,
}

impl PasscodeDigest {
    /// Digest with a fresh random salt
    pub fn hash(passcode: &str, params: &PasscodeKdfParams) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        Self::hash_with_salt(passcode, &salt, params)
    }

    /// Digest with a caller-supplied salt; same inputs give the same digest
    pub fn hash_with_salt(
        passcode: &str,
        salt: &SaltString,
        params: &PasscodeKdfParams,
    ) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(params.memory_kib)
            .t_cost(params.iterations)
            .p_cost(params.parallelism)
            .build()
            .map_err(|e| Error::Security(e.to_string()))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let hash = argon2
            .hash_password(passcode.as_bytes(), salt)
            .map_err(|e| Error::Security(e.to_string()))?
            .to_string();

        Ok(Self { hash })
    }

    /// Check a passcode against this digest. A malformed digest never matches.
    pub fn verify(&self, passcode: &str) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored passcode digest is unreadable: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(passcode.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// PHC string for storage
    pub fn hash_string(&self) -> &str {
        &self.hash
    }

    /// Load from stored PHC string
    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }
}

impl std::fmt::Debug for PasscodeDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasscodeDigest(..)")
    }
}

/// Fresh random challenge for a platform ceremony
pub fn generate_challenge() -> [u8; CHALLENGE_LEN] {
    let mut challenge = [0u8; CHALLENGE_LEN];
    OsRng.fill_bytes(&mut challenge);
    challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: PasscodeKdfParams = PasscodeKdfParams::light();

    #[test]
    fn test_passcode_hashing() {
        let digest = PasscodeDigest::hash("1234", &PARAMS).unwrap();
        assert!(digest.verify("1234"));
        assert!(!digest.verify("5678"));
        assert!(!digest.verify(""));
    }

    #[test]
    fn test_digest_is_argon2id_phc() {
        let digest = PasscodeDigest::hash("1234", &PARAMS).unwrap();
        let phc = digest.hash_string();
        assert!(phc.starts_with("$argon2id$v=19$"), "{phc}");
        assert!(phc.contains("m=64,t=1,p=1"), "{phc}");
        assert!(!phc.contains("1234"));
    }

    #[test]
    fn test_deterministic_with_salt() {
        let salt = SaltString::encode_b64(b"fixed-salt-bytes").unwrap();
        let a = PasscodeDigest::hash_with_salt("0420", &salt, &PARAMS).unwrap();
        let b = PasscodeDigest::hash_with_salt("0420", &salt, &PARAMS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_uses_embedded_params() {
        let digest = PasscodeDigest::hash("9876", &PasscodeKdfParams::default()).unwrap();
        let reloaded = PasscodeDigest::from_hash(digest.hash_string().to_string());
        assert!(reloaded.verify("9876"));
    }

    #[test]
    fn test_malformed_digest_never_matches() {
        let digest = PasscodeDigest::from_hash("MTIzNA==".to_string());
        assert!(!digest.verify("1234"));
    }

    #[test]
    fn test_passcode_validation() {
        assert!(validate_passcode("1234", 4).is_ok());
        assert!(validate_passcode("123", 4).is_err());
        assert!(validate_passcode("12345", 4).is_err());
        assert!(validate_passcode("12a4", 4).is_err());
        assert!(validate_passcode("١٢٣٤", 4).is_err());
        assert!(validate_passcode("123456", 6).is_ok());
    }

    #[test]
    fn test_challenges_are_fresh() {
        assert_ne!(generate_challenge(), generate_challenge());
    }
}
