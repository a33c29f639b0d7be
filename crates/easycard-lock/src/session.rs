//! Lock session controller
//!
//! Owns the in-memory lock state (locked flag and keypad) and performs every
//! persisted transition: enable, disable, pause, resume, passcode change.
//! Biometric unlock consumes an outcome produced elsewhere; the controller
//! never starts a platform ceremony itself, so passcode entry keeps working
//! while a prompt is pending.

use crate::activity::{ActivitySignal, ActivityTracker, LockDecision};
use crate::biometric::{BiometricOutcome, CredentialVault};
use crate::clock::Clock;
use crate::config::{LockConfiguration, LockOptions, LockTimeout};
use crate::events::{LockEvent, LockEventLog, LockReason, VerificationMethod};
use crate::gate::{Keypad, KeypadTiming, PasscodeGate, PasscodeVerifier};
use crate::security::{validate_passcode, PasscodeDigest};
use crate::settings::LockSettings;
use crate::{Error, Result};
use easycard_storage_sqlite::LockStore;
use std::sync::Arc;

/// Coarse lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No passcode enrolled
    Disabled,
    /// Passcode kept, lock suspended
    Paused,
    /// Enabled and unlocked
    Unlocked,
    /// Enabled and locked
    Locked,
}

/// Lock session state machine
pub struct LockSession {
    settings: LockSettings,
    tracker: ActivityTracker,
    verifier: PasscodeVerifier,
    vault: CredentialVault,
    options: LockOptions,
    locked: bool,
    keypad: Keypad,
    events: LockEventLog,
}

impl LockSession {
    /// Mount a session over `store`
    pub fn new(store: Arc<dyn LockStore>, clock: Arc<dyn Clock>, options: LockOptions) -> Self {
        let settings = LockSettings::new(store.clone());
        let mut session = Self {
            tracker: ActivityTracker::new(settings.clone(), clock),
            verifier: PasscodeVerifier::new(settings.clone(), options.passcode_length),
            vault: CredentialVault::new(store),
            keypad: Keypad::new(options.passcode_length),
            settings,
            options,
            locked: false,
            events: LockEventLog::new(),
        };
        session.mount();
        session
    }

    /// Recompute the lock state from the store, as on a fresh load
    pub fn mount(&mut self) {
        self.keypad.reset();
        self.locked = false;
        if !self.settings.is_enabled() {
            return;
        }
        if self.tracker.should_lock_on_start() {
            self.set_locked(LockReason::Startup);
        } else {
            self.tracker.record_activity();
        }
    }

    /// Persisted settings
    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Activity tracker
    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    /// Options in effect
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Current coarse state
    pub fn state(&self) -> LockState {
        if self.settings.is_enabled() {
            if self.locked {
                LockState::Locked
            } else {
                LockState::Unlocked
            }
        } else if self.settings.is_paused() {
            LockState::Paused
        } else {
            LockState::Disabled
        }
    }

    /// Lock enrolled and active
    pub fn is_enabled(&self) -> bool {
        self.settings.is_enabled()
    }

    /// Whether the lock screen is up
    pub fn is_locked(&self) -> bool {
        self.locked && self.settings.is_enabled()
    }

    /// Lock suspended with passcode kept
    pub fn is_paused(&self) -> bool {
        self.settings.is_paused()
    }

    /// Biometric unlock switched on
    pub fn is_biometric_enabled(&self) -> bool {
        self.settings.is_biometric_enabled()
    }

    /// Idle timeout policy
    pub fn lock_timeout(&self) -> LockTimeout {
        self.settings.lock_timeout()
    }

    /// Sensitive data masking
    pub fn is_hide_data_enabled(&self) -> bool {
        self.settings.is_hide_data_enabled()
    }

    /// Snapshot of the persisted configuration
    pub fn configuration(&self) -> LockConfiguration {
        self.settings.configuration()
    }

    /// Keypad state for rendering
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Clear a rejected entry once its feedback has been shown
    pub fn clear_rejected_entry(&mut self) {
        self.keypad.clear_rejected();
    }

    /// Lifecycle events recorded by this session
    pub fn events(&self) -> &[LockEvent] {
        self.events.events()
    }

    /// Drain recorded events
    pub fn take_events(&mut self) -> Vec<LockEvent> {
        self.events.take()
    }

    /// Enroll `passcode` and enable the lock, unlocked.
    ///
    /// Allowed from `Disabled` and `Paused`. An enabled lock must use
    /// [`LockSession::change_passcode`] instead.
    pub fn enable(&mut self, passcode: &str) -> Result<()> {
        validate_passcode(passcode, self.options.passcode_length)?;
        if self.settings.is_enabled() {
            return Err(Error::InvalidState(
                "Screen lock is already enabled".to_string(),
            ));
        }

        let digest = PasscodeDigest::hash(passcode, &self.options.kdf)?;
        self.settings.set_passcode_digest(digest.hash_string())?;
        self.settings.set_enabled(true)?;
        self.settings.set_paused(false)?;
        self.tracker.record_activity();

        self.locked = false;
        self.keypad.reset();
        self.events.record(LockEvent::Enabled);
        Ok(())
    }

    /// Full teardown: every lock key and the biometric credential.
    ///
    /// Both removals are attempted even if one fails; the first error is
    /// returned. The digest goes first, so a partial teardown reads as
    /// never enabled.
    pub fn disable(&mut self) -> Result<()> {
        let cleared = self.settings.clear_all();
        let revoked = self.vault.revoke();

        self.locked = false;
        self.keypad.reset();
        self.events.record(LockEvent::Disabled);
        cleared.and(revoked)
    }

    /// Disable after confirming the current passcode
    pub fn disable_with_passcode(&mut self, passcode: &str) -> Result<bool> {
        if !self.verifier.verify(passcode) {
            self.keypad.record_rejection();
            self.events.record(LockEvent::PasscodeRejected {
                attempts: self.keypad.attempts(),
            });
            return Ok(false);
        }
        self.disable()?;
        Ok(true)
    }

    /// Suspend the lock, keeping the passcode
    pub fn pause(&mut self) -> Result<()> {
        if !self.settings.is_enabled() {
            return Err(Error::InvalidState("Screen lock is not enabled".to_string()));
        }
        self.settings.set_enabled(false)?;
        self.settings.set_paused(true)?;

        self.locked = false;
        self.keypad.reset();
        self.events.record(LockEvent::Paused);
        Ok(())
    }

    /// Re-enable a paused lock without re-enrollment
    pub fn resume(&mut self) -> Result<()> {
        if !self.settings.is_paused() {
            return Err(Error::InvalidState("Screen lock is not paused".to_string()));
        }
        self.settings.set_enabled(true)?;
        self.settings.set_paused(false)?;
        self.tracker.record_activity();

        self.locked = false;
        self.events.record(LockEvent::Resumed);
        Ok(())
    }

    /// Check a passcode without changing any state
    pub fn verify_passcode(&self, passcode: &str) -> bool {
        self.verifier.verify(passcode)
    }

    /// Replace the passcode after verifying the old one.
    ///
    /// `Ok(false)` leaves the digest untouched; a malformed new passcode is
    /// an error.
    pub fn change_passcode(&mut self, old: &str, new: &str) -> Result<bool> {
        validate_passcode(new, self.options.passcode_length)?;
        if !self.verifier.verify(old) {
            return Ok(false);
        }
        let digest = PasscodeDigest::hash(new, &self.options.kdf)?;
        self.settings.set_passcode_digest(digest.hash_string())?;
        self.events.record(LockEvent::PasscodeChanged);
        Ok(true)
    }

    /// Unlock with a passcode. A mismatch counts one failed attempt.
    pub fn unlock(&mut self, passcode: &str) -> bool {
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

    /// Unlock with a biometric outcome obtained from the credential manager.
    ///
    /// Requires biometric unlock to be switched on. A failed outcome leaves
    /// the session locked and does not count as a passcode attempt.
    pub fn unlock_with_biometric(&mut self, outcome: &BiometricOutcome) -> bool {
        if !self.settings.is_biometric_enabled() || !outcome.is_success() {
            return false;
        }
        self.grant(VerificationMethod::Biometric);
        true
    }

    fn grant(&mut self, method: VerificationMethod) {
        let was_locked = self.locked;
        self.locked = false;
        self.keypad.reset();
        self.tracker.record_activity();
        if was_locked {
            self.events.record(LockEvent::Unlocked { method });
        }
    }

    /// Lock now. No effect unless the lock is enabled.
    pub fn lock(&mut self) {
        if self.settings.is_enabled() {
            self.set_locked(LockReason::Manual);
        }
    }

    fn set_locked(&mut self, reason: LockReason) {
        if self.locked {
            return;
        }
        self.locked = true;
        self.keypad.reset();
        self.events.record(LockEvent::Locked { reason });
    }

    /// Feed an environment signal; returns whether the session is locked after it.
    ///
    /// Evaluating the same signal twice is harmless: an already locked
    /// session is left untouched.
    pub fn handle_signal(&mut self, signal: ActivitySignal) -> bool {
        if !self.settings.is_enabled() {
            return false;
        }
        if signal == ActivitySignal::Interaction {
            if !self.locked {
                self.tracker.record_activity();
            }
            return self.locked;
        }
        if self.locked {
            return true;
        }

        if self.tracker.evaluate(signal) == LockDecision::Lock {
            let reason = match signal {
                ActivitySignal::Hidden => LockReason::Hidden,
                ActivitySignal::PageHide => LockReason::PageHide,
                _ => LockReason::IdleTimeout,
            };
            self.set_locked(reason);
        }
        self.locked
    }

    /// Switch biometric unlock on or off. Enrollment is separate.
    pub fn set_biometric_enabled(&mut self, enabled: bool) -> Result<()> {
        self.settings.set_biometric_enabled(enabled)
    }

    /// Change the idle timeout; restarts the idle clock while unlocked
    pub fn set_lock_timeout(&mut self, timeout: LockTimeout) -> Result<()> {
        self.settings.set_lock_timeout(timeout)?;
        if self.settings.is_enabled() && !self.locked {
            self.tracker.record_activity();
        }
        Ok(())
    }

    /// Toggle sensitive data masking
    pub fn set_hide_data_enabled(&mut self, enabled: bool) -> Result<()> {
        self.settings.set_hide_data_enabled(enabled)
    }

    /// Whether the lock screen should fire a biometric prompt as it opens
    pub fn should_auto_prompt_biometric(&self, authenticator_available: bool) -> bool {
        authenticator_available && self.is_locked() && self.settings.is_biometric_enabled()
    }
}

impl PasscodeGate for LockSession {
    fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    fn submit(&mut self, passcode: &str) -> bool {
        self.unlock(passcode)
    }

    fn timing(&self) -> KeypadTiming {
        self.options.lock_screen_timing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gate::GateOutcome;
    use chrono::TimeDelta;
    use easycard_storage_sqlite::{keys, MemoryLockStore};
    use zeroize::Zeroizing;

    fn session() -> (Arc<MemoryLockStore>, Arc<ManualClock>, LockSession) {
        let store = Arc::new(MemoryLockStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let session = LockSession::new(store.clone(), clock.clone(), LockOptions::light());
        (store, clock, session)
    }

    fn success() -> BiometricOutcome {
        BiometricOutcome::Success {
            identity: "+15550100".to_string(),
            secret: Some(Zeroizing::new("secret".to_string())),
        }
    }

    #[test]
    fn test_fresh_session_is_disabled() {
        let (_, _, session) = session();
        assert_eq!(session.state(), LockState::Disabled);
        assert!(!session.is_locked());
    }

    #[test]
    fn test_enable_then_lock_unlock() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        assert_eq!(session.state(), LockState::Unlocked);

        session.lock();
        assert_eq!(session.state(), LockState::Locked);
        assert!(!session.unlock("0000"));
        assert_eq!(session.keypad().attempts(), 1);
        assert!(session.is_locked());
        assert!(session.unlock("1234"));
        assert!(!session.is_locked());
        assert_eq!(session.keypad().attempts(), 0);
    }

    #[test]
    fn test_enable_rejects_bad_passcode() {
        let (store, _, mut session) = session();
        assert!(matches!(session.enable("12"), Err(Error::InvalidPasscode(_))));
        assert!(matches!(session.enable("abcd"), Err(Error::InvalidPasscode(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_enable_twice_is_rejected() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        assert!(matches!(session.enable("5678"), Err(Error::InvalidState(_))));
        assert!(session.verify_passcode("1234"));
    }

    #[test]
    fn test_lock_when_disabled_is_noop() {
        let (_, _, mut session) = session();
        session.lock();
        assert!(!session.is_locked());
        assert!(session.events().is_empty());
    }

    #[test]
    fn test_pause_resume() {
        let (store, _, mut session) = session();
        session.enable("1234").unwrap();
        session.pause().unwrap();
        assert_eq!(session.state(), LockState::Paused);
        assert_eq!(store.get(keys::SCREEN_LOCK_ENABLED).unwrap().as_deref(), Some("false"));
        assert_eq!(store.get(keys::SCREEN_LOCK_PAUSED).unwrap().as_deref(), Some("true"));

        session.lock();
        assert!(!session.is_locked());

        session.resume().unwrap();
        assert_eq!(session.state(), LockState::Unlocked);
        assert!(store.get(keys::SCREEN_LOCK_PAUSED).unwrap().is_none());
        assert!(session.verify_passcode("1234"));
    }

    #[test]
    fn test_pause_requires_enabled() {
        let (_, _, mut session) = session();
        assert!(matches!(session.pause(), Err(Error::InvalidState(_))));
        assert!(matches!(session.resume(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_enable_from_paused_clears_pause() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        session.pause().unwrap();
        session.enable("9876").unwrap();
        assert_eq!(session.state(), LockState::Unlocked);
        assert!(!session.is_paused());
        assert!(session.verify_passcode("9876"));
    }

    #[test]
    fn test_change_passcode() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();

        assert!(!session.change_passcode("0000", "5678").unwrap());
        assert!(session.verify_passcode("1234"));

        assert!(session.change_passcode("1234", "5678").unwrap());
        assert!(session.verify_passcode("5678"));
        assert!(!session.verify_passcode("1234"));

        assert!(session.change_passcode("5678", "56").is_err());
    }

    #[test]
    fn test_biometric_unlock_requires_flag() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        session.lock();

        assert!(!session.unlock_with_biometric(&success()));
        assert!(session.is_locked());

        session.set_biometric_enabled(true).unwrap();
        assert!(!session.unlock_with_biometric(&BiometricOutcome::Declined));
        assert_eq!(session.keypad().attempts(), 0);
        assert!(session.unlock_with_biometric(&success()));
        assert!(!session.is_locked());
    }

    #[test]
    fn test_hidden_with_immediate_policy_locks() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        assert!(session.handle_signal(ActivitySignal::Hidden));
        assert_eq!(
            session.events().last(),
            Some(&LockEvent::Locked {
                reason: LockReason::Hidden
            })
        );
    }

    #[test]
    fn test_repeated_signals_lock_once() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        session.take_events();

        session.handle_signal(ActivitySignal::Hidden);
        session.handle_signal(ActivitySignal::PageHide);
        session.handle_signal(ActivitySignal::Visible);
        assert_eq!(session.take_events().len(), 1);
        assert_eq!(session.keypad().attempts(), 0);
    }

    #[test]
    fn test_focus_loss_never_locks() {
        let (_, clock, mut session) = session();
        session.enable("1234").unwrap();
        clock.advance(TimeDelta::hours(2));
        assert!(!session.handle_signal(ActivitySignal::FocusLost));
    }

    #[test]
    fn test_interaction_defers_timeout() {
        let (_, clock, mut session) = session();
        session.enable("1234").unwrap();
        session.set_lock_timeout(LockTimeout::OneMinute).unwrap();

        clock.advance(TimeDelta::seconds(50));
        session.handle_signal(ActivitySignal::Interaction);
        clock.advance(TimeDelta::seconds(50));
        assert!(!session.handle_signal(ActivitySignal::Visible));

        clock.advance(TimeDelta::seconds(11));
        assert!(session.handle_signal(ActivitySignal::Visible));
    }

    #[test]
    fn test_mount_locks_after_timeout() {
        let (store, clock, mut session) = session();
        session.enable("1234").unwrap();
        session.set_lock_timeout(LockTimeout::FiveMinutes).unwrap();

        clock.advance(TimeDelta::minutes(6));
        let remounted = LockSession::new(store, clock, LockOptions::light());
        assert!(remounted.is_locked());
        assert_eq!(
            remounted.events(),
            &[LockEvent::Locked {
                reason: LockReason::Startup
            }]
        );
    }

    #[test]
    fn test_mount_never_policy_stays_unlocked() {
        let (store, clock, mut session) = session();
        session.enable("1234").unwrap();
        session.set_lock_timeout(LockTimeout::Never).unwrap();

        clock.advance(TimeDelta::days(30));
        let remounted = LockSession::new(store, clock, LockOptions::light());
        assert!(!remounted.is_locked());
    }

    #[test]
    fn test_keypad_auto_submits() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        session.lock();

        for d in ['0', '0', '0'] {
            assert_eq!(session.press_digit(d), GateOutcome::Pending);
        }
        assert_eq!(session.press_digit('0'), GateOutcome::Rejected { attempts: 1 });
        assert!(session.keypad().has_error());

        session.clear_rejected_entry();
        for d in ['1', '2', '3'] {
            session.press_digit(d);
        }
        assert_eq!(session.press_digit('4'), GateOutcome::Granted);
        assert!(!session.is_locked());
    }

    #[test]
    fn test_disable_with_passcode() {
        let (store, _, mut session) = session();
        session.enable("1234").unwrap();

        assert!(!session.disable_with_passcode("9999").unwrap());
        assert!(session.is_enabled());

        assert!(session.disable_with_passcode("1234").unwrap());
        assert_eq!(session.state(), LockState::Disabled);
        assert!(store.is_empty());
    }

    #[test]
    fn test_auto_prompt() {
        let (_, _, mut session) = session();
        session.enable("1234").unwrap();
        session.set_biometric_enabled(true).unwrap();
        assert!(!session.should_auto_prompt_biometric(true));

        session.lock();
        assert!(session.should_auto_prompt_biometric(true));
        assert!(!session.should_auto_prompt_biometric(false));
    }
}
