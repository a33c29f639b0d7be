//! Screen lock and biometric reveal for Easy Card
//!
//! Guards balances, card numbers and recovery flows while the app is
//! unattended or in the background.
//!
//! ## Components
//!
//! - **Activity tracking**: idle-time evaluation on visibility and page
//!   teardown signals ([`ActivityTracker`])
//! - **Biometric credentials**: platform credential enrollment and
//!   verification with an optionally bound secondary secret
//!   ([`BiometricManager`])
//! - **Lock session**: passcode enrollment, verification, lock/unlock,
//!   pause/resume ([`LockSession`])
//! - **Reveal gate**: transient unmasking of individual fields that never
//!   touches the main lock ([`RevealGate`])
//! - **Facade**: the command/query surface used by screens ([`ScreenLock`])
//!
//! Persistence goes through [`easycard_storage_sqlite::LockStore`].
//!
//! The bound secondary secret is only obfuscated, not encrypted; see
//! [`obfuscation`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod activity;
pub mod biometric;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod gate;
pub mod obfuscation;
pub mod platform;
pub mod reveal;
pub mod screen_lock;
pub mod security;
pub mod session;
pub mod settings;

pub use activity::{ActivitySignal, ActivityTracker, LockDecision};
pub use biometric::{BiometricManager, BiometricOutcome, CredentialVault, StoredCredential};
pub use cancel::CancelToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LockConfiguration, LockOptions, LockTimeout, PasscodeKdfParams, RelyingParty};
pub use enrollment::{EnrollmentProgress, EnrollmentStep, PasscodeEnrollment};
pub use error::{Error, Result};
pub use events::{LockEvent, LockReason, VerificationMethod};
pub use gate::{
    press_digit_paced, settle_rejected_entry, GateOutcome, Keypad, KeypadTiming, PasscodeGate,
    PasscodeVerifier,
};
pub use platform::{
    BiometricKind, MockAuthenticator, MockBehavior, PlatformAuthenticator, PlatformError,
};
pub use reveal::{RevealGate, RevealRequest};
pub use screen_lock::ScreenLock;
pub use security::PasscodeDigest;
pub use session::{LockSession, LockState};
pub use settings::LockSettings;
