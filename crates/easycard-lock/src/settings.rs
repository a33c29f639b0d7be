//! Typed access to the persisted lock configuration
//!
//! All reads fall back toward least privilege: an absent, unreadable or
//! corrupt value yields "lock not enabled", "biometric off", the strictest
//! timeout and an activity stamp at the epoch (so an enabled lock re-locks).

use crate::config::{LockConfiguration, LockTimeout};
use crate::Result;
use chrono::{DateTime, Utc};
use easycard_storage_sqlite::keys;
use easycard_storage_sqlite::LockStore;
use std::sync::Arc;

/// Lock configuration accessor over the persistent store
#[derive(Clone)]
pub struct LockSettings {
    store: Arc<dyn LockStore>,
}

impl LockSettings {
    /// Wrap a store
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self { store }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Lock store read failed for {}: {}", key, e);
                None
            }
        }
    }

    fn read_flag(&self, key: &str, default: bool) -> bool {
        match self.read(key).as_deref() {
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                tracing::warn!("Ignoring corrupt flag {}={:?}", key, other);
                default
            }
            None => default,
        }
    }

    fn write_flag(&self, key: &str, value: bool) -> Result<()> {
        self.store.set(key, if value { "true" } else { "false" })?;
        Ok(())
    }

    /// Stored passcode digest
    pub fn passcode_digest(&self) -> Option<String> {
        self.read(keys::SCREEN_LOCK_PASSCODE).filter(|d| !d.is_empty())
    }

    /// Whether a passcode digest is enrolled
    pub fn has_passcode(&self) -> bool {
        self.passcode_digest().is_some()
    }

    /// Replace the passcode digest
    pub fn set_passcode_digest(&self, digest: &str) -> Result<()> {
        self.store.set(keys::SCREEN_LOCK_PASSCODE, digest)?;
        Ok(())
    }

    /// Lock is enabled. Requires an enrolled digest; the digest is checked first.
    pub fn is_enabled(&self) -> bool {
        self.has_passcode() && self.read_flag(keys::SCREEN_LOCK_ENABLED, false)
    }

    /// Set the enabled flag
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(keys::SCREEN_LOCK_ENABLED, enabled)
    }

    /// Lock is paused with a retained digest
    pub fn is_paused(&self) -> bool {
        self.has_passcode() && self.read_flag(keys::SCREEN_LOCK_PAUSED, false)
    }

    /// Set or clear the paused flag
    pub fn set_paused(&self, paused: bool) -> Result<()> {
        if paused {
            self.write_flag(keys::SCREEN_LOCK_PAUSED, true)
        } else {
            self.store.remove(keys::SCREEN_LOCK_PAUSED)?;
            Ok(())
        }
    }

    /// Biometric unlock allowed
    pub fn is_biometric_enabled(&self) -> bool {
        self.read_flag(keys::SCREEN_LOCK_BIOMETRIC, false)
    }

    /// Set the biometric flag
    pub fn set_biometric_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(keys::SCREEN_LOCK_BIOMETRIC, enabled)
    }

    /// Idle timeout policy
    pub fn lock_timeout(&self) -> LockTimeout {
        match self.read(keys::SCREEN_LOCK_TIMEOUT) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring corrupt lock timeout {:?}", raw);
                LockTimeout::Immediately
            }),
            None => LockTimeout::Immediately,
        }
    }

    /// Set the idle timeout policy
    pub fn set_lock_timeout(&self, timeout: LockTimeout) -> Result<()> {
        self.store.set(keys::SCREEN_LOCK_TIMEOUT, timeout.as_str())?;
        Ok(())
    }

    /// Sensitive data masking; on unless explicitly disabled
    pub fn is_hide_data_enabled(&self) -> bool {
        self.read_flag(keys::SCREEN_LOCK_HIDE_DATA, true)
    }

    /// Set the masking flag
    pub fn set_hide_data_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(keys::SCREEN_LOCK_HIDE_DATA, enabled)
    }

    /// Last recorded activity; the epoch when absent or corrupt
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.read(keys::SCREEN_LOCK_LAST_ACTIVITY)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Record activity at `at`
    pub fn set_last_activity(&self, at: DateTime<Utc>) -> Result<()> {
        self.store
            .set(keys::SCREEN_LOCK_LAST_ACTIVITY, &at.timestamp_millis().to_string())?;
        Ok(())
    }

    /// Snapshot of the persisted configuration
    pub fn configuration(&self) -> LockConfiguration {
        LockConfiguration {
            enabled: self.is_enabled(),
            biometric_enabled: self.is_biometric_enabled(),
            timeout_policy: self.lock_timeout(),
            hide_data_enabled: self.is_hide_data_enabled(),
            paused: self.is_paused(),
        }
    }

    /// Remove every lock configuration key, digest first.
    ///
    /// Keeps going after a failed removal and reports the first error.
    pub fn clear_all(&self) -> Result<()> {
        let mut first_error = None;
        for key in keys::SCREEN_LOCK_KEYS {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use easycard_storage_sqlite::MemoryLockStore;

    fn settings_with(entries: &[(&str, &str)]) -> LockSettings {
        LockSettings::new(Arc::new(MemoryLockStore::with_entries(
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )))
    }

    #[test]
    fn test_empty_store_defaults() {
        let settings = settings_with(&[]);
        assert_eq!(settings.configuration(), LockConfiguration::default());
        assert_eq!(settings.last_activity(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_enabled_requires_digest() {
        let settings = settings_with(&[(keys::SCREEN_LOCK_ENABLED, "true")]);
        assert!(!settings.is_enabled());

        settings.set_passcode_digest("$argon2id$stub").unwrap();
        assert!(settings.is_enabled());
    }

    #[test]
    fn test_corrupt_values_fall_back() {
        let settings = settings_with(&[
            (keys::SCREEN_LOCK_PASSCODE, "$argon2id$stub"),
            (keys::SCREEN_LOCK_ENABLED, "yes"),
            (keys::SCREEN_LOCK_TIMEOUT, "10min"),
            (keys::SCREEN_LOCK_HIDE_DATA, "maybe"),
            (keys::SCREEN_LOCK_LAST_ACTIVITY, "yesterday"),
        ]);
        assert!(!settings.is_enabled());
        assert_eq!(settings.lock_timeout(), LockTimeout::Immediately);
        assert!(settings.is_hide_data_enabled());
        assert_eq!(settings.last_activity(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_paused_flag_removed_when_cleared() {
        let settings = settings_with(&[(keys::SCREEN_LOCK_PASSCODE, "$argon2id$stub")]);
        settings.set_paused(true).unwrap();
        assert!(settings.is_paused());

        settings.set_paused(false).unwrap();
        assert!(!settings.is_paused());
        assert!(settings.store().get(keys::SCREEN_LOCK_PAUSED).unwrap().is_none());
    }

    #[test]
    fn test_last_activity_round_trip() {
        let settings = settings_with(&[]);
        let at = DateTime::from_timestamp_millis(1_700_000_123_456).unwrap();
        settings.set_last_activity(at).unwrap();
        assert_eq!(settings.last_activity(), at);
    }

    #[test]
    fn test_clear_all_removes_every_key() {
        let settings = settings_with(&[]);
        settings.set_passcode_digest("$argon2id$stub").unwrap();
        settings.set_enabled(true).unwrap();
        settings.set_biometric_enabled(true).unwrap();
        settings.set_lock_timeout(LockTimeout::FiveMinutes).unwrap();
        settings.set_hide_data_enabled(false).unwrap();
        settings.set_paused(true).unwrap();
        settings.set_last_activity(Utc::now()).unwrap();

        settings.clear_all().unwrap();
        for key in keys::SCREEN_LOCK_KEYS {
            assert!(settings.store().get(key).unwrap().is_none(), "{key} survived");
        }
    }
}
