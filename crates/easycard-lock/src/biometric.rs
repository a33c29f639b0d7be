//! Biometric credential manager
//!
//! Enrolls a platform credential bound to an account identity, optionally
//! binding an obfuscated secondary secret to it, and runs verification
//! challenges. Platform failures never escape as errors: every ceremony
//! resolves to a [`BiometricOutcome`] or a plain `bool`.

use crate::cancel::CancelToken;
use crate::config::{LockOptions, RelyingParty};
use crate::obfuscation::{deobfuscate, key_for_credential, obfuscate};
use crate::platform::{
    AssertionRequest, BiometricKind, CredentialCreationRequest, PlatformAuthenticator,
    PlatformError,
};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use easycard_storage_sqlite::{keys, LockStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Result of a biometric verification challenge
pub enum BiometricOutcome {
    /// User verified
    Success {
        /// Identity bound at enrollment
        identity: String,
        /// Recovered secondary secret, if one was bound
        secret: Option<Zeroizing<String>>,
    },
    /// User cancelled, verification failed, or the credential was revoked
    Declined,
    /// No authenticator or no enrolled credential
    Unavailable,
}

impl BiometricOutcome {
    /// Whether the user was verified
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Bound identity on success
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Success { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Recovered secret on success
    pub fn secret(&self) -> Option<&str> {
        match self {
            Self::Success { secret, .. } => secret.as_ref().map(|s| s.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for BiometricOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { secret, .. } => f
                .debug_struct("Success")
                .field("identity", &"<redacted>")
                .field("has_secret", &secret.is_some())
                .finish(),
            Self::Declined => f.write_str("Declined"),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Persisted credential record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    /// Base64 of the platform credential reference
    pub credential_id: String,
    /// Bound identity
    pub phone_number: String,
}

impl StoredCredential {
    /// Record for a raw credential reference
    pub fn new(raw_id: &[u8], identity: &str) -> Self {
        Self {
            credential_id: STANDARD.encode(raw_id),
            phone_number: identity.to_string(),
        }
    }

    /// Decoded credential reference
    pub fn raw_id(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.credential_id)
            .map_err(|e| Error::Biometric(format!("Credential reference is not base64: {}", e)))
    }
}

/// Store-backed credential record
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn LockStore>,
}

impl CredentialVault {
    /// Wrap a store
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Stored credential; `None` when absent, unreadable or corrupt
    pub fn load(&self) -> Option<StoredCredential> {
        let raw = match self.store.get(keys::BIOMETRIC_CREDENTIAL) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read biometric credential: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<StoredCredential>(&raw) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!("Ignoring corrupt biometric credential record: {}", e);
                None
            }
        }
    }

    /// Persist a credential and its optional secret.
    ///
    /// A secret left over from an earlier credential is removed since it can
    /// no longer be recovered with the new reference.
    /// Nothing is written unless the record and secret both encode cleanly.
    pub fn save(&self, credential: &StoredCredential, secret: Option<&str>) -> Result<()> {
        let record = serde_json::to_string(credential)?;
        let obfuscated = match secret {
            Some(secret) => Some(obfuscate(secret, &key_for_credential(&credential.raw_id()?))?),
            None => None,
        };

        self.store.set(keys::BIOMETRIC_CREDENTIAL, &record)?;
        self.store.set(keys::BIOMETRIC_PHONE, &credential.phone_number)?;
        match obfuscated {
            Some(obfuscated) => self.store.set(keys::BIOMETRIC_PASSWORD, &obfuscated)?,
            None => self.store.remove(keys::BIOMETRIC_PASSWORD)?,
        }
        Ok(())
    }

    /// Recover the secret bound to `credential`, if any
    pub fn secret_for(&self, credential: &StoredCredential) -> Option<Zeroizing<String>> {
        let encoded = match self.store.get(keys::BIOMETRIC_PASSWORD) {
            Ok(encoded) => encoded?,
            Err(e) => {
                tracing::warn!("Failed to read bound secret: {}", e);
                return None;
            }
        };
        let raw_id = credential.raw_id().ok()?;
        match deobfuscate(&encoded, &key_for_credential(&raw_id)) {
            Ok(secret) => Some(secret),
            Err(e) => {
                tracing::warn!("Bound secret unreadable: {}", e);
                None
            }
        }
    }

    /// Delete reference, identity and secret. Idempotent.
    pub fn revoke(&self) -> Result<()> {
        let mut first_error = None;
        for key in keys::BIOMETRIC_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Failed to remove {}: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Whether a usable credential record exists
    pub fn is_enrolled(&self) -> bool {
        self.load().is_some()
    }

    /// Identity bound to the stored credential
    pub fn stored_identity(&self) -> Option<String> {
        self.load().map(|c| c.phone_number)
    }
}

/// Enrolls and authenticates platform biometric credentials
pub struct BiometricManager {
    vault: CredentialVault,
    authenticator: Arc<dyn PlatformAuthenticator>,
    relying_party: RelyingParty,
    timeout: Duration,
}

impl BiometricManager {
    /// Create a manager over a store and a platform authenticator
    pub fn new(
        store: Arc<dyn LockStore>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        options: &LockOptions,
    ) -> Self {
        Self {
            vault: CredentialVault::new(store),
            authenticator,
            relying_party: options.relying_party.clone(),
            timeout: options.biometric_timeout(),
        }
    }

    /// Credential record
    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Modality for prompt labels
    pub fn kind(&self) -> BiometricKind {
        self.authenticator.biometric_kind()
    }

    /// Whether a user-verifying authenticator is present. Never fails.
    pub async fn is_available(&self) -> bool {
        match self.authenticator.is_user_verifying_available().await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!("Authenticator capability query failed: {}", e);
                false
            }
        }
    }

    /// Whether a credential is enrolled
    pub fn is_enrolled(&self) -> bool {
        self.vault.is_enrolled()
    }

    /// Identity bound to the enrolled credential
    pub fn stored_identity(&self) -> Option<String> {
        self.vault.stored_identity()
    }

    /// Create and persist a credential bound to `identity`.
    ///
    /// Returns `false` when the authenticator is missing, the user declines,
    /// the ceremony times out, or the record cannot be stored.
    pub async fn enroll(&self, identity: &str, secret: Option<&str>) -> bool {
        if !self.is_available().await {
            tracing::info!("Biometric enrollment skipped: no authenticator");
            return false;
        }

        let request = CredentialCreationRequest::new(self.relying_party.clone(), identity, self.timeout);
        let created = match tokio::time::timeout(
            self.timeout,
            self.authenticator.create_credential(&request),
        )
        .await
        {
            Ok(Ok(Some(created))) => created,
            Ok(Ok(None)) => {
                tracing::warn!("Biometric enrollment returned no credential");
                return false;
            }
            Ok(Err(e)) => {
                tracing::warn!("Biometric enrollment failed: {}", e);
                return false;
            }
            Err(_) => {
                tracing::warn!("Biometric enrollment timed out after {:?}", self.timeout);
                return false;
            }
        };

        if created.raw_id.is_empty() {
            tracing::warn!("Biometric enrollment returned an empty credential id");
            return false;
        }

        let credential = StoredCredential::new(&created.raw_id, identity);
        if let Err(e) = self.vault.save(&credential, secret) {
            tracing::warn!("Failed to persist biometric credential: {}", e);
            if let Err(e) = self.vault.revoke() {
                tracing::warn!("Failed to discard partial biometric credential: {}", e);
            }
            return false;
        }

        tracing::info!(has_secret = secret.is_some(), "Biometric credential enrolled");
        true
    }

    /// Run a verification challenge against the enrolled credential
    pub async fn authenticate(&self) -> BiometricOutcome {
        self.authenticate_with_cancel(&CancelToken::new()).await
    }

    /// Like [`BiometricManager::authenticate`], resolving to
    /// [`BiometricOutcome::Declined`] as soon as `cancel` fires
    pub async fn authenticate_with_cancel(&self, cancel: &CancelToken) -> BiometricOutcome {
        if !self.is_available().await {
            return BiometricOutcome::Unavailable;
        }
        let Some(credential) = self.vault.load() else {
            tracing::debug!("No biometric credential enrolled");
            return BiometricOutcome::Unavailable;
        };
        let raw_id = match credential.raw_id() {
            Ok(raw_id) => raw_id,
            Err(e) => {
                tracing::warn!("{}", e);
                return BiometricOutcome::Unavailable;
            }
        };

        let request = AssertionRequest::for_credential(raw_id, self.timeout);
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Biometric prompt cancelled");
                return BiometricOutcome::Declined;
            }
            result = tokio::time::timeout(self.timeout, self.authenticator.get_assertion(&request)) => result,
        };

        match result {
            Ok(Ok(Some(_assertion))) => {
                let secret = self.vault.secret_for(&credential);
                tracing::info!("Biometric verification succeeded");
                BiometricOutcome::Success {
                    identity: credential.phone_number,
                    secret,
                }
            }
            Ok(Ok(None)) => BiometricOutcome::Declined,
            Ok(Err(PlatformError::NotAvailable)) => BiometricOutcome::Unavailable,
            Ok(Err(e)) => {
                tracing::warn!("Biometric verification failed: {}", e);
                BiometricOutcome::Declined
            }
            Err(_) => {
                tracing::warn!("Biometric verification timed out after {:?}", self.timeout);
                BiometricOutcome::Declined
            }
        }
    }

    /// Delete the enrolled credential and bound secret. Idempotent.
    pub fn revoke(&self) -> Result<()> {
        self.vault.revoke()?;
        tracing::info!("Biometric credential revoked");
        Ok(())
    }
}
