//! Structured lock lifecycle logging

#![allow(missing_docs)]

use tracing::{debug, info, warn};

/// Why the session locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Explicit `lock()` call
    Manual,
    /// App went to background with the immediate policy
    Hidden,
    /// Page teardown with the immediate policy
    PageHide,
    /// Idle time exceeded the policy on return to foreground
    IdleTimeout,
    /// Session mounted after the idle timeout elapsed
    Startup,
}

impl LockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Hidden => "hidden",
            Self::PageHide => "pagehide",
            Self::IdleTimeout => "idle_timeout",
            Self::Startup => "startup",
        }
    }
}

/// How a verification was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    Passcode,
    Biometric,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passcode => "passcode",
            Self::Biometric => "biometric",
        }
    }
}

/// Lock lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    Enabled,
    Disabled,
    Paused,
    Resumed,
    Locked { reason: LockReason },
    Unlocked { method: VerificationMethod },
    PasscodeRejected { attempts: u32 },
    PasscodeChanged,
    Revealed { method: VerificationMethod },
}

/// In-memory event log for one session
#[derive(Debug, Default)]
pub struct LockEventLog {
    events: Vec<LockEvent>,
}

impl LockEventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Log an event and keep it
    pub fn record(&mut self, event: LockEvent) {
        match &event {
            LockEvent::Enabled => info!(event = "screen_lock_enabled", "Screen lock enabled"),
            LockEvent::Disabled => info!(event = "screen_lock_disabled", "Screen lock disabled"),
            LockEvent::Paused => info!(event = "screen_lock_paused", "Screen lock paused"),
            LockEvent::Resumed => info!(event = "screen_lock_resumed", "Screen lock resumed"),
            LockEvent::Locked { reason } => info!(
                event = "screen_locked",
                reason = %reason.as_str(),
                "Screen locked"
            ),
            LockEvent::Unlocked { method } => info!(
                event = "screen_unlocked",
                method = %method.as_str(),
                "Screen unlocked"
            ),
            LockEvent::PasscodeRejected { attempts } => warn!(
                event = "passcode_rejected",
                attempts = %attempts,
                "Passcode rejected"
            ),
            LockEvent::PasscodeChanged => {
                info!(event = "passcode_changed", "Passcode changed")
            }
            LockEvent::Revealed { method } => debug!(
                event = "data_revealed",
                method = %method.as_str(),
                "Sensitive data revealed"
            ),
        }
        self.events.push(event);
    }

    /// Events recorded so far
    pub fn events(&self) -> &[LockEvent] {
        &self.events
    }

    /// Most recent event
    pub fn last(&self) -> Option<&LockEvent> {
        self.events.last()
    }

    /// Drain recorded events
    pub fn take(&mut self) -> Vec<LockEvent> {
        std::mem::take(&mut self.events)
    }
}
