//! Platform authenticator boundary
//!
//! The biometric ceremony itself (Face ID, Touch ID, Windows Hello, Android
//! biometrics) lives in native code. This module defines the request and
//! response shapes crossing that boundary and the [`PlatformAuthenticator`]
//! trait native bridges implement.

use crate::config::RelyingParty;
use crate::security::{generate_challenge, CHALLENGE_LEN};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::time::Duration;

/// Errors reported by a platform authenticator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// User cancelled, declined, or verification failed
    #[error("Not allowed by user or platform")]
    NotAllowed,
    /// No user-verifying authenticator on this device
    #[error("Authenticator not available")]
    NotAvailable,
    /// Ceremony timed out on the platform side
    #[error("Ceremony timed out")]
    Timeout,
    /// Credential unknown to the platform (revoked or wiped)
    #[error("Credential not recognised")]
    UnknownCredential,
    /// Anything else
    #[error("Platform error: {0}")]
    Other(String),
}

/// Biometric modality, used for prompt labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricKind {
    /// Apple face recognition
    FaceId,
    /// Apple fingerprint
    TouchId,
    /// Windows Hello
    WindowsHello,
    /// Generic fingerprint sensor
    Fingerprint,
    /// Unknown modality
    Generic,
}

impl BiometricKind {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::FaceId => "Face ID",
            Self::TouchId => "Touch ID",
            Self::WindowsHello => "Windows Hello",
            Self::Fingerprint => "Fingerprint",
            Self::Generic => "Biometric",
        }
    }
}

/// COSE signature algorithm identifiers offered at enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CoseAlgorithm {
    /// ECDSA P-256 with SHA-256
    Es256 = -7,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    Rs256 = -257,
}

/// User verification requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVerification {
    /// User must be present and verified (biometric or local PIN)
    Required,
    /// Verification if the authenticator supports it
    Preferred,
}

/// Credential transport hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Built into the device
    Internal,
}

/// Account the credential is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque user handle
    pub id: Vec<u8>,
    /// Account name
    pub name: String,
    /// Display name
    pub display_name: String,
}

impl UserEntity {
    /// Entity whose handle, name and display name all derive from `identity`
    pub fn from_identity(identity: &str) -> Self {
        Self {
            id: identity.as_bytes().to_vec(),
            name: identity.to_string(),
            display_name: identity.to_string(),
        }
    }
}

/// Credential creation request
#[derive(Debug, Clone)]
pub struct CredentialCreationRequest {
    /// Scope of the credential
    pub relying_party: RelyingParty,
    /// Per-attempt random challenge
    pub challenge: [u8; CHALLENGE_LEN],
    /// Bound account
    pub user: UserEntity,
    /// Acceptable key algorithms, in preference order
    pub algorithms: Vec<CoseAlgorithm>,
    /// Only on-device (platform) authenticators
    pub platform_attachment: bool,
    /// User verification requirement
    pub user_verification: UserVerification,
    /// Prefer a discoverable credential
    pub resident_key_preferred: bool,
    /// Ceremony timeout
    pub timeout: Duration,
}

impl CredentialCreationRequest {
    /// Request for a user-verified platform credential bound to `identity`
    pub fn new(relying_party: RelyingParty, identity: &str, timeout: Duration) -> Self {
        Self {
            relying_party,
            challenge: generate_challenge(),
            user: UserEntity::from_identity(identity),
            algorithms: vec![CoseAlgorithm::Es256, CoseAlgorithm::Rs256],
            platform_attachment: true,
            user_verification: UserVerification::Required,
            resident_key_preferred: true,
            timeout,
        }
    }
}

/// Credential permitted in an assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedCredential {
    /// Credential reference
    pub id: Vec<u8>,
    /// Transports
    pub transports: Vec<Transport>,
}

/// Assertion (authentication) request
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    /// Fresh random challenge
    pub challenge: [u8; CHALLENGE_LEN],
    /// Credentials the platform may use
    pub allow_credentials: Vec<AllowedCredential>,
    /// User verification requirement
    pub user_verification: UserVerification,
    /// Ceremony timeout
    pub timeout: Duration,
}

impl AssertionRequest {
    /// Request restricted to one on-device credential
    pub fn for_credential(credential_id: Vec<u8>, timeout: Duration) -> Self {
        Self {
            challenge: generate_challenge(),
            allow_credentials: vec![AllowedCredential {
                id: credential_id,
                transports: vec![Transport::Internal],
            }],
            user_verification: UserVerification::Required,
            timeout,
        }
    }
}

/// Newly created platform credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCredential {
    /// Opaque credential reference
    pub raw_id: Vec<u8>,
}

/// Successful assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Credential that answered
    pub credential_id: Vec<u8>,
}

/// Native biometric authenticator bridge.
///
/// `Ok(None)` means the platform finished the ceremony without producing a
/// credential or assertion.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Whether a user-verifying platform authenticator is present
    async fn is_user_verifying_available(&self) -> Result<bool, PlatformError>;

    /// Create a credential
    async fn create_credential(
        &self,
        request: &CredentialCreationRequest,
    ) -> Result<Option<CreatedCredential>, PlatformError>;

    /// Run a verification challenge
    async fn get_assertion(
        &self,
        request: &AssertionRequest,
    ) -> Result<Option<Assertion>, PlatformError>;

    /// Modality for prompt labels
    fn biometric_kind(&self) -> BiometricKind {
        BiometricKind::Generic
    }
}

/// Scripted response of [`MockAuthenticator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Ceremonies succeed
    Approve,
    /// User declines
    Decline,
    /// Platform fails with the given error
    Fail(PlatformError),
    /// Ceremony never completes
    Hang,
}

/// Mock authenticator for tests and platforms without a native bridge
pub struct MockAuthenticator {
    available: bool,
    kind: BiometricKind,
    behavior: RwLock<MockBehavior>,
    credentials: Mutex<HashSet<Vec<u8>>>,
    next_id: Mutex<u64>,
    last_creation: Mutex<Option<CredentialCreationRequest>>,
    last_assertion: Mutex<Option<AssertionRequest>>,
}

impl MockAuthenticator {
    /// Available authenticator that approves every ceremony
    pub fn new() -> Self {
        Self {
            available: true,
            kind: BiometricKind::Fingerprint,
            behavior: RwLock::new(MockBehavior::Approve),
            credentials: Mutex::new(HashSet::new()),
            next_id: Mutex::new(1),
            last_creation: Mutex::new(None),
            last_assertion: Mutex::new(None),
        }
    }

    /// Device without a user-verifying authenticator
    pub fn unavailable() -> Self {
        Self {
            available: false,
            kind: BiometricKind::Generic,
            ..Self::new()
        }
    }

    /// Override the reported modality
    pub fn with_kind(mut self, kind: BiometricKind) -> Self {
        self.kind = kind;
        self
    }

    /// Change how future ceremonies respond
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Forget every credential, as if wiped in device settings
    pub fn revoke_all(&self) {
        self.credentials.lock().clear();
    }

    /// Most recent creation request
    pub fn last_creation(&self) -> Option<CredentialCreationRequest> {
        self.last_creation.lock().clone()
    }

    /// Most recent assertion request
    pub fn last_assertion(&self) -> Option<AssertionRequest> {
        self.last_assertion.lock().clone()
    }

    async fn scripted(&self) -> Result<(), PlatformError> {
        let behavior = self.behavior.read().clone();
        match behavior {
            MockBehavior::Approve => Ok(()),
            MockBehavior::Decline => Err(PlatformError::NotAllowed),
            MockBehavior::Fail(e) => Err(e),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

impl Default for MockAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformAuthenticator for MockAuthenticator {
    async fn is_user_verifying_available(&self) -> Result<bool, PlatformError> {
        Ok(self.available)
    }

    async fn create_credential(
        &self,
        request: &CredentialCreationRequest,
    ) -> Result<Option<CreatedCredential>, PlatformError> {
        *self.last_creation.lock() = Some(request.clone());
        if !self.available {
            return Err(PlatformError::NotAvailable);
        }
        self.scripted().await?;

        let raw_id = {
            let mut next = self.next_id.lock();
            let id = format!("mock-credential-{}", *next).into_bytes();
            *next += 1;
            id
        };
        self.credentials.lock().insert(raw_id.clone());
        Ok(Some(CreatedCredential { raw_id }))
    }

    async fn get_assertion(
        &self,
        request: &AssertionRequest,
    ) -> Result<Option<Assertion>, PlatformError> {
        *self.last_assertion.lock() = Some(request.clone());
        if !self.available {
            return Err(PlatformError::NotAvailable);
        }
        self.scripted().await?;

        let credentials = self.credentials.lock();
        let known = request
            .allow_credentials
            .iter()
            .find(|allowed| credentials.contains(&allowed.id));
        match known {
            Some(allowed) => Ok(Some(Assertion {
                credential_id: allowed.id.clone(),
            })),
            None => Err(PlatformError::UnknownCredential),
        }
    }

    fn biometric_kind(&self) -> BiometricKind {
        self.kind
    }
}
