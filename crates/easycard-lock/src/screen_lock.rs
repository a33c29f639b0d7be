//! Command/query surface consumed by the rest of the app

use crate::activity::ActivitySignal;
use crate::biometric::{BiometricManager, BiometricOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::{LockConfiguration, LockOptions, LockTimeout};
use crate::platform::{BiometricKind, PlatformAuthenticator};
use crate::reveal::RevealGate;
use crate::session::{LockSession, LockState};
use crate::Result;
use easycard_storage_sqlite::LockStore;
use std::sync::Arc;

/// Screen lock facade: lock session plus biometric credentials over one store
pub struct ScreenLock {
    store: Arc<dyn LockStore>,
    session: LockSession,
    biometrics: Arc<BiometricManager>,
    options: LockOptions,
}

impl ScreenLock {
    /// Mount with the system clock
    pub fn new(
        store: Arc<dyn LockStore>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        options: LockOptions,
    ) -> Self {
        Self::with_clock(store, authenticator, Arc::new(SystemClock), options)
    }

    /// Mount with an explicit clock
    pub fn with_clock(
        store: Arc<dyn LockStore>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        clock: Arc<dyn Clock>,
        options: LockOptions,
    ) -> Self {
        let biometrics = Arc::new(BiometricManager::new(store.clone(), authenticator, &options));
        let session = LockSession::new(store.clone(), clock, options.clone());
        Self {
            store,
            session,
            biometrics,
            options,
        }
    }

    /// Lock session controller
    pub fn session(&self) -> &LockSession {
        &self.session
    }

    /// Mutable lock session controller (keypad input)
    pub fn session_mut(&mut self) -> &mut LockSession {
        &mut self.session
    }

    /// Shared biometric manager, for prompts that run alongside passcode entry
    pub fn biometrics(&self) -> Arc<BiometricManager> {
        Arc::clone(&self.biometrics)
    }

    /// Masked reveal gate sharing this lock's store
    pub fn new_reveal_gate(&self) -> RevealGate {
        RevealGate::new(self.store.clone(), &self.options)
    }

    /// Lock enrolled and active
    pub fn is_enabled(&self) -> bool {
        self.session.is_enabled()
    }

    /// Lock screen up
    pub fn is_locked(&self) -> bool {
        self.session.is_locked()
    }

    /// Biometric unlock on
    pub fn is_biometric_enabled(&self) -> bool {
        self.session.is_biometric_enabled()
    }

    /// Idle timeout policy
    pub fn lock_timeout(&self) -> LockTimeout {
        self.session.lock_timeout()
    }

    /// Data masking on
    pub fn is_hide_data_enabled(&self) -> bool {
        self.session.is_hide_data_enabled()
    }

    /// Lock suspended
    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }

    /// Coarse state
    pub fn state(&self) -> LockState {
        self.session.state()
    }

    /// Persisted configuration snapshot
    pub fn configuration(&self) -> LockConfiguration {
        self.session.configuration()
    }

    /// Enroll a passcode and enable the lock
    pub fn enable_screen_lock(&mut self, passcode: &str) -> Result<()> {
        self.session.enable(passcode)
    }

    /// Remove every lock key and the biometric credential
    pub fn disable_screen_lock(&mut self) -> Result<()> {
        self.session.disable()
    }

    /// Suspend the lock, keeping the passcode
    pub fn pause_screen_lock(&mut self) -> Result<()> {
        self.session.pause()
    }

    /// Resume a paused lock
    pub fn resume_screen_lock(&mut self) -> Result<()> {
        self.session.resume()
    }

    /// Check a passcode
    pub fn verify_passcode(&self, passcode: &str) -> bool {
        self.session.verify_passcode(passcode)
    }

    /// Replace the passcode
    pub fn change_passcode(&mut self, old: &str, new: &str) -> Result<bool> {
        self.session.change_passcode(old, new)
    }

    /// Unlock with a passcode
    pub fn unlock(&mut self, passcode: &str) -> bool {
        self.session.unlock(passcode)
    }

    /// Run a biometric prompt and unlock on success.
    ///
    /// Holds the session for the whole ceremony. UIs that must keep the
    /// keypad live should run [`BiometricManager::authenticate_with_cancel`]
    /// on [`ScreenLock::biometrics`] and hand the result to
    /// [`ScreenLock::unlock_with_biometric_outcome`].
    pub async fn unlock_with_biometric(&mut self) -> bool {
        if !self.session.is_biometric_enabled() || !self.session.is_locked() {
            return false;
        }
        let outcome = self.biometrics.authenticate().await;
        self.session.unlock_with_biometric(&outcome)
    }

    /// Unlock with an outcome obtained separately
    pub fn unlock_with_biometric_outcome(&mut self, outcome: &BiometricOutcome) -> bool {
        self.session.unlock_with_biometric(outcome)
    }

    /// Lock now
    pub fn lock(&mut self) {
        self.session.lock()
    }

    /// Feed an environment signal
    pub fn handle_signal(&mut self, signal: ActivitySignal) -> bool {
        self.session.handle_signal(signal)
    }

    /// Toggle biometric unlock. Turning it on does not enroll a credential.
    pub fn set_biometric_enabled(&mut self, enabled: bool) -> Result<()> {
        self.session.set_biometric_enabled(enabled)
    }

    /// Enroll a credential bound to `identity` and switch biometric unlock on.
    ///
    /// `Ok(false)` when the platform refused; the flag is left as it was.
    pub async fn enroll_biometric(&mut self, identity: &str, secret: Option<&str>) -> Result<bool> {
        if !self.biometrics.enroll(identity, secret).await {
            return Ok(false);
        }
        self.session.set_biometric_enabled(true)?;
        Ok(true)
    }

    /// Set the idle timeout policy
    pub fn set_lock_timeout(&mut self, timeout: LockTimeout) -> Result<()> {
        self.session.set_lock_timeout(timeout)
    }

    /// Toggle data masking
    pub fn set_hide_data_enabled(&mut self, enabled: bool) -> Result<()> {
        self.session.set_hide_data_enabled(enabled)
    }

    /// Run a biometric prompt for `gate`
    pub async fn reveal_with_biometric(&self, gate: &mut RevealGate) -> bool {
        if !self.session.is_biometric_enabled() {
            return false;
        }
        let outcome = self.biometrics.authenticate().await;
        gate.reveal_with_biometric(&outcome)
    }

    /// Whether the lock overlay should prompt for biometrics as it opens
    pub async fn should_auto_prompt_biometric(&self) -> bool {
        if !self.session.should_auto_prompt_biometric(true) {
            return false;
        }
        self.biometrics.is_available().await
    }

    /// "Or use Face ID" style label
    pub fn biometric_kind(&self) -> BiometricKind {
        self.biometrics.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::platform::{MockAuthenticator, MockBehavior};
    use easycard_storage_sqlite::MemoryLockStore;

    fn screen_lock(mock: Arc<MockAuthenticator>) -> ScreenLock {
        ScreenLock::with_clock(
            Arc::new(MemoryLockStore::new()),
            mock,
            Arc::new(ManualClock::starting_now()),
            LockOptions::light(),
        )
    }

    #[tokio::test]
    async fn test_biometric_unlock_flow() {
        let mock = Arc::new(MockAuthenticator::new());
        let mut lock = screen_lock(mock.clone());
        lock.enable_screen_lock("1234").unwrap();
        assert!(lock.enroll_biometric("+15550100", None).await.unwrap());
        assert!(lock.is_biometric_enabled());

        lock.lock();
        assert!(lock.should_auto_prompt_biometric().await);
        assert!(lock.unlock_with_biometric().await);
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_declined_prompt_keeps_lock() {
        let mock = Arc::new(MockAuthenticator::new());
        let mut lock = screen_lock(mock.clone());
        lock.enable_screen_lock("1234").unwrap();
        assert!(lock.enroll_biometric("user", None).await.unwrap());
        lock.lock();

        mock.set_behavior(MockBehavior::Decline);
        assert!(!lock.unlock_with_biometric().await);
        assert!(lock.is_locked());
        assert!(lock.unlock("1234"));
    }

    #[tokio::test]
    async fn test_failed_enrollment_leaves_flag_off() {
        let mock = Arc::new(MockAuthenticator::unavailable());
        let mut lock = screen_lock(mock);
        lock.enable_screen_lock("1234").unwrap();
        assert!(!lock.enroll_biometric("user", None).await.unwrap());
        assert!(!lock.is_biometric_enabled());
    }

    #[tokio::test]
    async fn test_disable_revokes_credential() {
        let mut lock = screen_lock(Arc::new(MockAuthenticator::new()));
        lock.enable_screen_lock("1234").unwrap();
        assert!(lock.enroll_biometric("user", Some("pw")).await.unwrap());

        lock.disable_screen_lock().unwrap();
        assert!(!lock.biometrics().is_enrolled());
        assert_eq!(lock.state(), LockState::Disabled);
    }

    #[tokio::test]
    async fn test_reveal_with_biometric() {
        let mut lock = screen_lock(Arc::new(MockAuthenticator::new()));
        lock.enable_screen_lock("1234").unwrap();
        assert!(lock.enroll_biometric("user", None).await.unwrap());

        let mut gate = lock.new_reveal_gate();
        assert!(lock.reveal_with_biometric(&mut gate).await);
        assert!(gate.revealed());
        assert!(!lock.is_locked());
    }
}
