//! Lock configuration types
//!
//! [`LockConfiguration`] is the persisted user-facing configuration; it is
//! read from the store by [`crate::settings::LockSettings`]. [`LockOptions`]
//! holds the build/deployment tunables that never change at runtime.

use crate::gate::KeypadTiming;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Idle timeout after which an unlocked session re-locks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockTimeout {
    /// Lock as soon as the app is hidden
    #[default]
    #[serde(rename = "immediately")]
    Immediately,
    /// 60 seconds
    #[serde(rename = "1min")]
    OneMinute,
    /// 300 seconds
    #[serde(rename = "5min")]
    FiveMinutes,
    /// 900 seconds
    #[serde(rename = "15min")]
    FifteenMinutes,
    /// 1800 seconds
    #[serde(rename = "30min")]
    ThirtyMinutes,
    /// Never lock on idle
    #[serde(rename = "never")]
    Never,
}

impl LockTimeout {
    /// All policies in menu order
    pub const ALL: [LockTimeout; 6] = [
        Self::Immediately,
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::Never,
    ];

    /// Idle duration, `None` for [`LockTimeout::Never`]
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Immediately => Some(Duration::ZERO),
            Self::OneMinute => Some(Duration::from_secs(60)),
            Self::FiveMinutes => Some(Duration::from_secs(5 * 60)),
            Self::FifteenMinutes => Some(Duration::from_secs(15 * 60)),
            Self::ThirtyMinutes => Some(Duration::from_secs(30 * 60)),
            Self::Never => None,
        }
    }

    /// Persisted selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediately => "immediately",
            Self::OneMinute => "1min",
            Self::FiveMinutes => "5min",
            Self::FifteenMinutes => "15min",
            Self::ThirtyMinutes => "30min",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for LockTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockTimeout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown lock timeout: {s}")))
    }
}

/// Persisted lock configuration snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockConfiguration {
    /// Lock is active
    pub enabled: bool,
    /// Biometric unlock is allowed
    pub biometric_enabled: bool,
    /// Idle timeout policy
    pub timeout_policy: LockTimeout,
    /// Sensitive fields are masked until revealed
    pub hide_data_enabled: bool,
    /// Lock is paused; the passcode is kept
    pub paused: bool,
}

impl Default for LockConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            biometric_enabled: false,
            timeout_policy: LockTimeout::Immediately,
            hide_data_enabled: true,
            paused: false,
        }
    }
}

/// Argon2id cost parameters for the passcode digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasscodeKdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Iterations
    pub iterations: u32,
    /// Lanes
    pub parallelism: u32,
}

impl PasscodeKdfParams {
    /// Minimal parameters for tests and constrained previews
    pub const fn light() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

impl Default for PasscodeKdfParams {
    /// 16 MiB, 2 iterations, 2 lanes
    fn default() -> Self {
        Self {
            memory_kib: 16384,
            iterations: 2,
            parallelism: 2,
        }
    }
}

/// Relying party presented to the platform authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Scope identifier (host name of the app origin)
    pub id: String,
    /// Display name
    pub name: String,
}

impl Default for RelyingParty {
    fn default() -> Self {
        Self {
            id: "localhost".to_string(),
            name: "Easy Card".to_string(),
        }
    }
}

/// Deployment tunables for the lock subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Digits in a passcode; entry auto-submits at this length
    pub passcode_length: usize,
    /// Digest cost
    pub kdf: PasscodeKdfParams,
    /// Delay before an auto-submitted passcode is checked (presentation only)
    pub auto_submit_delay_ms: u64,
    /// How long a rejected entry stays visible on the lock screen
    pub rejected_entry_clear_ms: u64,
    /// How long a rejected entry stays visible on the reveal prompt
    pub reveal_rejected_entry_clear_ms: u64,
    /// Relying party for biometric ceremonies
    pub relying_party: RelyingParty,
    /// Platform ceremony timeout
    pub biometric_timeout_secs: u64,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            passcode_length: 4,
            kdf: PasscodeKdfParams::default(),
            auto_submit_delay_ms: 100,
            rejected_entry_clear_ms: 500,
            reveal_rejected_entry_clear_ms: 300,
            relying_party: RelyingParty::default(),
            biometric_timeout_secs: 60,
        }
    }
}

impl LockOptions {
    /// Default options with the light digest preset
    pub fn light() -> Self {
        Self {
            kdf: PasscodeKdfParams::light(),
            ..Self::default()
        }
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Reject option combinations the lock cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(4..=8).contains(&self.passcode_length) {
            return Err(Error::Config(format!(
                "passcode_length must be 4-8, got {}",
                self.passcode_length
            )));
        }
        if self.kdf.parallelism == 0 || self.kdf.iterations == 0 {
            return Err(Error::Config("kdf iterations and parallelism must be non-zero".into()));
        }
        if self.kdf.memory_kib < 8 * self.kdf.parallelism {
            return Err(Error::Config("kdf memory_kib must be at least 8 * parallelism".into()));
        }
        if self.biometric_timeout_secs == 0 {
            return Err(Error::Config("biometric_timeout_secs must be non-zero".into()));
        }
        Ok(())
    }

    /// Auto-submit delay
    pub fn auto_submit_delay(&self) -> Duration {
        Duration::from_millis(self.auto_submit_delay_ms)
    }

    /// Rejected entry display time on the lock screen
    pub fn rejected_entry_clear(&self) -> Duration {
        Duration::from_millis(self.rejected_entry_clear_ms)
    }

    /// Rejected entry display time on the reveal prompt
    pub fn reveal_rejected_entry_clear(&self) -> Duration {
        Duration::from_millis(self.reveal_rejected_entry_clear_ms)
    }

    /// Keypad delays on the lock screen
    pub fn lock_screen_timing(&self) -> KeypadTiming {
        KeypadTiming {
            auto_submit_delay: self.auto_submit_delay(),
            rejected_entry_clear: self.rejected_entry_clear(),
        }
    }

    /// Keypad delays on the reveal prompt
    pub fn reveal_timing(&self) -> KeypadTiming {
        KeypadTiming {
            auto_submit_delay: self.auto_submit_delay(),
            rejected_entry_clear: self.reveal_rejected_entry_clear(),
        }
    }

    /// Biometric ceremony timeout
    pub fn biometric_timeout(&self) -> Duration {
        Duration::from_secs(self.biometric_timeout_secs)
    }
}
