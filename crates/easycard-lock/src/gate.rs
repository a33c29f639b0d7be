//! Passcode keypad and the shared verification primitive
//!
//! The lock screen and the reveal prompt drive the same keypad: digits are
//! collected until the configured length is reached, at which point the
//! entry is submitted automatically. A rejected entry stays on screen with
//! the error flag set until the UI clears it or the next digit is pressed.

use crate::security::{validate_passcode, PasscodeDigest};
use crate::settings::LockSettings;
use std::time::Duration;
use zeroize::Zeroizing;

/// Attempts at which the counter becomes visible
pub const ATTEMPTS_DISPLAY_THRESHOLD: u32 = 3;

/// Result of a single key press on the keypad
#[derive(Debug, PartialEq, Eq)]
pub enum KeyPress {
    /// Not a digit, or the entry is already full
    Ignored,
    /// Digit accepted, entry not yet complete
    Incomplete,
    /// Entry reached full length and should be verified
    Complete(Zeroizing<String>),
}

/// Presentation delays applied around an auto-submitted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadTiming {
    /// Pause between the last digit and the check
    pub auto_submit_delay: Duration,
    /// How long a rejected entry stays visible
    pub rejected_entry_clear: Duration,
}

/// Transient passcode entry state
pub struct Keypad {
    digits: Zeroizing<String>,
    length: usize,
    error: bool,
    attempts: u32,
}

impl Keypad {
    /// Empty keypad for passcodes of `length` digits
    pub fn new(length: usize) -> Self {
        Self {
            digits: Zeroizing::new(String::with_capacity(length)),
            length,
            error: false,
            attempts: 0,
        }
    }

    /// Enter one digit
    pub fn press_digit(&mut self, digit: char) -> KeyPress {
        if !digit.is_ascii_digit() {
            return KeyPress::Ignored;
        }
        if self.error {
            self.clear_rejected();
        }
        if self.digits.len() >= self.length {
            return KeyPress::Ignored;
        }

        self.digits.push(digit);
        if self.digits.len() == self.length {
            KeyPress::Complete(self.digits.clone())
        } else {
            KeyPress::Incomplete
        }
    }

    /// Remove the last digit
    pub fn backspace(&mut self) {
        if self.error {
            self.clear_rejected();
            return;
        }
        self.digits.pop();
    }

    /// Mark the current entry as rejected
    pub fn record_rejection(&mut self) {
        self.error = true;
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Clear a rejected entry after its feedback delay
    pub fn clear_rejected(&mut self) {
        self.digits.clear();
        self.error = false;
    }

    /// Back to the mount state
    pub fn reset(&mut self) {
        self.digits.clear();
        self.error = false;
        self.attempts = 0;
    }

    /// Digits entered so far (for dot indicators)
    pub fn entered(&self) -> usize {
        self.digits.len()
    }

    /// Passcode length
    pub fn length(&self) -> usize {
        self.length
    }

    /// Rejected entry still on screen
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Failed attempts since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the attempt counter should be shown
    pub fn show_attempts(&self) -> bool {
        self.attempts >= ATTEMPTS_DISPLAY_THRESHOLD
    }
}

impl std::fmt::Debug for Keypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypad")
            .field("entered", &self.digits.len())
            .field("length", &self.length)
            .field("error", &self.error)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Checks entered passcodes against the stored digest
#[derive(Clone)]
pub struct PasscodeVerifier {
    settings: LockSettings,
    length: usize,
}

impl PasscodeVerifier {
    /// Verifier over the stored digest
    pub fn new(settings: LockSettings, length: usize) -> Self {
        Self { settings, length }
    }

    /// Malformed input, a missing digest or a mismatch all return `false`
    pub fn verify(&self, passcode: &str) -> bool {
        if validate_passcode(passcode, self.length).is_err() {
            return false;
        }
        match self.settings.passcode_digest() {
            Some(stored) => PasscodeDigest::from_hash(stored).verify(passcode),
            None => false,
        }
    }
}

/// Outcome of a key press on a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Key had no effect
    Ignored,
    /// Waiting for more digits
    Pending,
    /// Full entry verified
    Granted,
    /// Full entry rejected
    Rejected {
        /// Failed attempts so far
        attempts: u32,
    },
}

/// Anything unlocked by typing the passcode on a keypad
pub trait PasscodeGate {
    /// Keypad driving this gate
    fn keypad_mut(&mut self) -> &mut Keypad;

    /// Verify a complete entry and apply the result
    fn submit(&mut self, passcode: &str) -> bool;

    /// Delays used by [`press_digit_paced`] and [`settle_rejected_entry`]
    fn timing(&self) -> KeypadTiming;

    /// Enter a digit, auto-submitting when the entry is complete
    fn press_digit(&mut self, digit: char) -> GateOutcome {
        match self.keypad_mut().press_digit(digit) {
            KeyPress::Ignored => GateOutcome::Ignored,
            KeyPress::Incomplete => GateOutcome::Pending,
            KeyPress::Complete(entry) => {
                if self.submit(&entry) {
                    GateOutcome::Granted
                } else {
                    GateOutcome::Rejected {
                        attempts: self.keypad_mut().attempts(),
                    }
                }
            }
        }
    }
}

/// Enter a digit, waiting `auto_submit_delay` before checking a complete entry
pub async fn press_digit_paced<G: PasscodeGate + ?Sized>(gate: &mut G, digit: char) -> GateOutcome {
    match gate.keypad_mut().press_digit(digit) {
        KeyPress::Ignored => GateOutcome::Ignored,
        KeyPress::Incomplete => GateOutcome::Pending,
        KeyPress::Complete(entry) => {
            tokio::time::sleep(gate.timing().auto_submit_delay).await;
            if gate.submit(&entry) {
                GateOutcome::Granted
            } else {
                GateOutcome::Rejected {
                    attempts: gate.keypad_mut().attempts(),
                }
            }
        }
    }
}

/// Keep a rejected entry visible for `rejected_entry_clear`, then clear it.
///
/// Does nothing when no rejection is showing.
pub async fn settle_rejected_entry<G: PasscodeGate + ?Sized>(gate: &mut G) {
    if !gate.keypad_mut().has_error() {
        return;
    }
    tokio::time::sleep(gate.timing().rejected_entry_clear).await;
    gate.keypad_mut().clear_rejected();
}
