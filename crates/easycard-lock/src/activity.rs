//! Idle tracking and lock-trigger evaluation
//!
//! Only two kinds of signal may lock the session: visibility transitions and
//! the page-teardown signal. Plain focus loss is ignored because moving
//! between screens inside the app produces it too.

use crate::clock::Clock;
use crate::config::LockTimeout;
use crate::settings::LockSettings;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Environment signal delivered to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    /// Pointer, keyboard or touch input
    Interaction,
    /// App moved to the background / became hidden
    Hidden,
    /// App returned to the foreground / resumed
    Visible,
    /// Low-level page teardown
    PageHide,
    /// Window lost focus
    FocusLost,
}

/// Result of evaluating a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
    /// Session must lock now
    Lock,
    /// Session stays as it is
    Remain,
    /// Decision postponed until the app is visible again
    Deferred,
}

/// Whether the idle time between `last_activity` and `now` exceeds `timeout`.
///
/// Strictly greater: an idle time equal to the timeout does not lock. A clock
/// that moved backwards counts as zero idle time.
pub fn exceeds_timeout(timeout: LockTimeout, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let Some(limit) = timeout.duration() else {
        return false;
    };
    let idle = (now - last_activity).to_std().unwrap_or_default();
    idle > limit
}

/// Pure decision table for a signal under a policy
pub fn decide(
    signal: ActivitySignal,
    timeout: LockTimeout,
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LockDecision {
    match signal {
        ActivitySignal::Interaction | ActivitySignal::FocusLost => LockDecision::Remain,
        ActivitySignal::Hidden if timeout == LockTimeout::Immediately => LockDecision::Lock,
        ActivitySignal::Hidden => LockDecision::Deferred,
        ActivitySignal::PageHide if timeout == LockTimeout::Immediately => LockDecision::Lock,
        ActivitySignal::PageHide => LockDecision::Remain,
        ActivitySignal::Visible if exceeds_timeout(timeout, last_activity, now) => LockDecision::Lock,
        ActivitySignal::Visible => LockDecision::Remain,
    }
}

/// Tracks user activity and evaluates idle timeouts
#[derive(Clone)]
pub struct ActivityTracker {
    settings: LockSettings,
    clock: Arc<dyn Clock>,
}

impl ActivityTracker {
    /// Create a tracker over the given settings and clock
    pub fn new(settings: LockSettings, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    /// Current time from the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Refresh the activity stamp to now. Failures are logged, never raised.
    pub fn record_activity(&self) {
        let now = self.clock.now();
        if let Err(e) = self.settings.set_last_activity(now) {
            tracing::warn!("Failed to record activity: {}", e);
        }
    }

    /// Time since the last recorded activity
    pub fn idle_time(&self) -> std::time::Duration {
        (self.clock.now() - self.settings.last_activity())
            .to_std()
            .unwrap_or_default()
    }

    /// Evaluate a signal against the persisted policy and activity stamp.
    ///
    /// Read-only: calling it repeatedly for the same state yields the same
    /// decision. Interaction refreshes are the caller's job via
    /// [`ActivityTracker::record_activity`].
    pub fn evaluate(&self, signal: ActivitySignal) -> LockDecision {
        let timeout = self.settings.lock_timeout();
        let decision = decide(signal, timeout, self.settings.last_activity(), self.clock.now());
        tracing::debug!(?signal, %timeout, ?decision, "Lock evaluation");
        decision
    }

    /// Whether a freshly mounted session should start locked
    pub fn should_lock_on_start(&self) -> bool {
        exceeds_timeout(
            self.settings.lock_timeout(),
            self.settings.last_activity(),
            self.clock.now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeDelta;
    use easycard_storage_sqlite::MemoryLockStore;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_exceeds_timeout_boundary() {
        let last = at(0);
        assert!(!exceeds_timeout(LockTimeout::FiveMinutes, last, at(299)));
        assert!(!exceeds_timeout(LockTimeout::FiveMinutes, last, at(300)));
        assert!(exceeds_timeout(LockTimeout::FiveMinutes, last, at(301)));
    }

    #[test]
    fn test_never_does_not_expire() {
        assert!(!exceeds_timeout(LockTimeout::Never, at(0), at(10_000_000)));
    }

    #[test]
    fn test_backwards_clock_counts_as_active() {
        assert!(!exceeds_timeout(LockTimeout::OneMinute, at(500), at(0)));
    }

    #[test]
    fn test_hidden_decisions() {
        let now = at(10);
        assert_eq!(
            decide(ActivitySignal::Hidden, LockTimeout::Immediately, now, now),
            LockDecision::Lock
        );
        assert_eq!(
            decide(ActivitySignal::Hidden, LockTimeout::FiveMinutes, now, now),
            LockDecision::Deferred
        );
    }

    #[test]
    fn test_page_hide_only_locks_immediately_policy() {
        let now = at(10);
        assert_eq!(
            decide(ActivitySignal::PageHide, LockTimeout::Immediately, now, now),
            LockDecision::Lock
        );
        assert_eq!(
            decide(ActivitySignal::PageHide, LockTimeout::OneMinute, at(0), at(1000)),
            LockDecision::Remain
        );
    }

    #[test]
    fn test_focus_loss_never_locks() {
        for timeout in LockTimeout::ALL {
            assert_eq!(
                decide(ActivitySignal::FocusLost, timeout, at(0), at(100_000)),
                LockDecision::Remain
            );
        }
    }

    #[test]
    fn test_tracker_reads_persisted_state() {
        let settings = LockSettings::new(Arc::new(MemoryLockStore::new()));
        let clock = Arc::new(ManualClock::new(at(0)));
        let tracker = ActivityTracker::new(settings.clone(), clock.clone());

        settings.set_lock_timeout(LockTimeout::OneMinute).unwrap();
        tracker.record_activity();
        clock.advance(TimeDelta::seconds(61));

        assert_eq!(tracker.evaluate(ActivitySignal::Visible), LockDecision::Lock);
        // Evaluation has no side effects
        assert_eq!(tracker.evaluate(ActivitySignal::Visible), LockDecision::Lock);
        assert_eq!(tracker.idle_time(), std::time::Duration::from_secs(61));

        tracker.record_activity();
        assert_eq!(tracker.evaluate(ActivitySignal::Visible), LockDecision::Remain);
    }

    #[test]
    fn test_missing_stamp_locks_on_start() {
        let settings = LockSettings::new(Arc::new(MemoryLockStore::new()));
        let tracker = ActivityTracker::new(settings, Arc::new(ManualClock::new(at(0))));
        assert!(tracker.should_lock_on_start());
    }
}
