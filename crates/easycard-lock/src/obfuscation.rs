//! Reversible obfuscation of the biometric-bound secondary secret
//!
//! **This is obfuscation, not encryption.** The key stream is the base64 text
//! of the platform credential reference, which is stored right next to the
//! obfuscated value. Anyone who can read the lock store can reverse it. The
//! scheme is kept so secrets written by earlier releases stay readable. Those
//! releases stored one byte per character, so recovered bytes that are not
//! UTF-8 are read back as Latin-1; characters beyond U+00FF could never be
//! stored by them. It deters casual inspection only and must not be relied on to protect a real
//! password. Replacing it with keystore-backed encryption is tracked in the
//! design notes.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

/// XOR `secret` with the repeating `key` and base64-encode the result
pub fn obfuscate(secret: &str, key: &[u8]) -> Result<String> {
    if key.is_empty() {
        return Err(Error::Security("Obfuscation key is empty".to_string()));
    }
    let mixed = Zeroizing::new(xor_with_key(secret.as_bytes(), key));
    Ok(STANDARD.encode(mixed.as_slice()))
}

/// Reverse [`obfuscate`]
pub fn deobfuscate(encoded: &str, key: &[u8]) -> Result<Zeroizing<String>> {
    if key.is_empty() {
        return Err(Error::Security("Obfuscation key is empty".to_string()));
    }
    let mixed = Zeroizing::new(
        STANDARD
            .decode(encoded)
            .map_err(|e| Error::Encoding(e.to_string()))?,
    );
    let plain = xor_with_key(&mixed, key);
    match String::from_utf8(plain) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(e) => {
            let bytes = Zeroizing::new(e.into_bytes());
            Ok(Zeroizing::new(bytes.iter().map(|&b| char::from(b)).collect()))
        }
    }
}

/// Key material for a credential reference: its base64 text
pub fn key_for_credential(credential_id: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(STANDARD.encode(credential_id).into_bytes())
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let key = key_for_credential(&[7, 1, 200, 33, 91]);
        let sealed = obfuscate("hunter2!", &key).unwrap();
        assert_ne!(sealed, "hunter2!");
        assert_eq!(deobfuscate(&sealed, &key).unwrap().as_str(), "hunter2!");
    }

    #[test]
    fn test_matches_legacy_ascii_encoding() {
        // 'a' ^ 'K' = 0x2a, 'b' ^ 'e' = 0x07, 'c' ^ 'K' = 0x28
        let sealed = obfuscate("abc", b"Ke").unwrap();
        assert_eq!(STANDARD.decode(&sealed).unwrap(), vec![0x2a, 0x07, 0x28]);
    }

    #[test]
    fn test_reads_legacy_latin1_secret() {
        // 'é' (0xE9) stored as a single byte: 0xE9 ^ 'K' = 0xA2
        assert_eq!(deobfuscate("og==", b"K").unwrap().as_str(), "é");
        // "café" ^ "K" repeated
        let legacy: Vec<u8> = [b'c', b'a', b'f', 0xE9].iter().map(|b| b ^ b'K').collect();
        let sealed = STANDARD.encode(legacy);
        assert_eq!(deobfuscate(&sealed, b"K").unwrap().as_str(), "café");
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let sealed = obfuscate("pässwörd", b"key").unwrap();
        assert_eq!(deobfuscate(&sealed, b"key").unwrap().as_str(), "pässwörd");
    }

    #[test]
    fn test_wrong_key_does_not_recover() {
        let sealed = obfuscate("secret", b"AAAA").unwrap();
        let recovered = deobfuscate(&sealed, b"BBBB").unwrap();
        assert_ne!(recovered.as_str(), "secret");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(obfuscate("secret", b"").is_err());
        assert!(deobfuscate("AAAA", b"").is_err());
    }

    #[test]
    fn test_corrupt_encoding_rejected() {
        assert!(matches!(deobfuscate("not base64!", b"k"), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_empty_secret() {
        let sealed = obfuscate("", b"key").unwrap();
        assert_eq!(deobfuscate(&sealed, b"key").unwrap().as_str(), "");
    }
}
