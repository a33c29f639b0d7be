//! Reveal gate for masked fields
//!
//! A transient authorization that unmasks sensitive values (balances, card
//! numbers) without touching the main lock. The flag lives only in memory:
//! a new gate, or a reload, always starts masked.

use crate::biometric::BiometricOutcome;
use crate::config::LockOptions;
use crate::events::{LockEvent, LockEventLog, VerificationMethod};
use crate::gate::{Keypad, KeypadTiming, PasscodeGate, PasscodeVerifier};
use crate::settings::LockSettings;
use easycard_storage_sqlite::LockStore;
use std::sync::Arc;

/// Answer to a reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealRequest {
    /// Data may be shown
    Revealed,
    /// Passcode or biometric check needed first
    VerificationRequired,
}

/// Transient per-screen reveal authorization
pub struct RevealGate {
    settings: LockSettings,
    verifier: PasscodeVerifier,
    keypad: Keypad,
    timing: KeypadTiming,
    revealed: bool,
    events: LockEventLog,
}

impl RevealGate {
    /// Masked gate over `store`
    pub fn new(store: Arc<dyn LockStore>, options: &LockOptions) -> Self {
        let settings = LockSettings::new(store);
        Self {
            verifier: PasscodeVerifier::new(settings.clone(), options.passcode_length),
            keypad: Keypad::new(options.passcode_length),
            timing: options.reveal_timing(),
            settings,
            revealed: false,
            events: LockEventLog::new(),
        }
    }

    /// Whether sensitive data is currently shown
    pub fn revealed(&self) -> bool {
        self.revealed
    }

    /// Whether revealing needs a check: masking on and a lock enrolled
    pub fn requires_verification(&self) -> bool {
        self.settings.is_hide_data_enabled() && self.settings.is_enabled()
    }

    /// Ask to show the data. Without masking or a lock it is shown at once.
    pub fn request_reveal(&mut self) -> RevealRequest {
        if self.revealed {
            return RevealRequest::Revealed;
        }
        if !self.requires_verification() {
            self.revealed = true;
            return RevealRequest::Revealed;
        }
        self.keypad.reset();
        RevealRequest::VerificationRequired
    }

    /// Reveal with the lock passcode
    pub fn reveal_with_passcode(&mut self, passcode: &str) -> bool {
        if self.verifier.verify(passcode) {
            self.grant(VerificationMethod::Passcode);
            return true;
        }
        self.keypad.record_rejection();
        self.events.record(LockEvent::PasscodeRejected {
            attempts: self.keypad.attempts(),
        });
        false
    }

    /// Reveal with a fresh biometric outcome
    pub fn reveal_with_biometric(&mut self, outcome: &BiometricOutcome) -> bool {
        if !self.settings.is_biometric_enabled() || !outcome.is_success() {
            return false;
        }
        self.grant(VerificationMethod::Biometric);
        true
    }

    fn grant(&mut self, method: VerificationMethod) {
        self.revealed = true;
        self.keypad.reset();
        self.events.record(LockEvent::Revealed { method });
    }

    /// Mask again
    pub fn conceal(&mut self) {
        self.revealed = false;
        self.keypad.reset();
    }

    /// Keypad state for rendering
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Clear a rejected entry once its feedback has been shown
    pub fn clear_rejected_entry(&mut self) {
        self.keypad.clear_rejected();
    }

    /// Events recorded by this gate
    pub fn events(&self) -> &[LockEvent] {
        self.events.events()
    }

    /// Whether the prompt should fire a biometric attempt as it opens
    pub fn should_auto_prompt_biometric(&self, authenticator_available: bool) -> bool {
        authenticator_available && !self.revealed && self.settings.is_biometric_enabled()
    }
}

impl PasscodeGate for RevealGate {
    fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    fn submit(&mut self, passcode: &str) -> bool {
        self.reveal_with_passcode(passcode)
    }

    fn timing(&self) -> KeypadTiming {
        self.timing
    }
}
