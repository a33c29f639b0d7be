//! Property-based tests for easycard-lock
//!
//! Uses proptest to verify lock invariants across randomized inputs

use argon2::password_hash::SaltString;
use chrono::{DateTime, TimeDelta};
use easycard_lock::activity::{decide, exceeds_timeout};
use easycard_lock::obfuscation::{deobfuscate, key_for_credential, obfuscate};
use easycard_lock::{
    ActivitySignal, LockDecision, LockOptions, LockSession, LockTimeout, ManualClock,
    PasscodeDigest, PasscodeKdfParams,
};
use easycard_storage_sqlite::MemoryLockStore;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

/// Valid 4-digit passcode
fn passcode_strategy() -> impl Strategy<Value = String> {
    "[0-9]{4}"
}

/// Two distinct valid passcodes
fn distinct_passcodes() -> impl Strategy<Value = (String, String)> {
    (passcode_strategy(), passcode_strategy()).prop_filter("passcodes must differ", |(a, b)| a != b)
}

fn timeout_strategy() -> impl Strategy<Value = LockTimeout> {
    prop::sample::select(LockTimeout::ALL.to_vec())
}

fn fresh_session() -> LockSession {
    LockSession::new(
        Arc::new(MemoryLockStore::new()),
        Arc::new(ManualClock::starting_now()),
        LockOptions::light(),
    )
}

// ============================================================================
// Passcode Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: same passcode and salt give the same digest
    #[test]
    fn prop_digest_is_deterministic(passcode in passcode_strategy(), salt_bytes in prop::array::uniform16(any::<u8>())) {
        let salt = SaltString::encode_b64(&salt_bytes).unwrap();
        let params = PasscodeKdfParams::light();

        let first = PasscodeDigest::hash_with_salt(&passcode, &salt, &params).unwrap();
        let second = PasscodeDigest::hash_with_salt(&passcode, &salt, &params).unwrap();
        prop_assert_eq!(first.hash_string(), second.hash_string());
        prop_assert!(first.verify(&passcode));
    }

    /// Property: enabling with p makes p verify
    #[test]
    fn prop_enabled_passcode_verifies(passcode in passcode_strategy()) {
        let mut session = fresh_session();
        session.enable(&passcode).unwrap();
        prop_assert!(session.verify_passcode(&passcode));
    }

    /// Property: a different passcode never verifies
    #[test]
    fn prop_other_passcode_rejected((p1, p2) in distinct_passcodes()) {
        let mut session = fresh_session();
        session.enable(&p1).unwrap();
        prop_assert!(!session.verify_passcode(&p2));
    }

    /// Property: pause/resume keeps the passcode
    #[test]
    fn prop_pause_resume_preserves_passcode(passcode in passcode_strategy()) {
        let mut session = fresh_session();
        session.enable(&passcode).unwrap();
        session.pause().unwrap();
        session.resume().unwrap();
        prop_assert!(session.verify_passcode(&passcode));
    }
}

// ============================================================================
// Obfuscation Properties
// ============================================================================

proptest! {
    /// Property: deobfuscate(obfuscate(s, r), r) == s
    #[test]
    fn prop_obfuscation_round_trip(
        secret in "\\PC{0,64}",
        credential in prop::collection::vec(any::<u8>(), 1..64)
    ) {
        let key = key_for_credential(&credential);
        let encoded = obfuscate(&secret, &key).unwrap();
        let decoded = deobfuscate(&encoded, &key).unwrap();
        prop_assert_eq!(decoded.as_str(), secret.as_str());
    }
}

// ============================================================================
// Timeout Properties
// ============================================================================

proptest! {
    /// Property: idle time strictly above the policy locks on visible, at or below does not
    #[test]
    fn prop_visible_boundary(timeout in timeout_strategy(), slack in 1i64..3600) {
        let last = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let limit = match timeout.duration() {
            Some(limit) => TimeDelta::from_std(limit).unwrap(),
            None => {
                let far = last + TimeDelta::days(3650);
                prop_assert_eq!(decide(ActivitySignal::Visible, timeout, last, far), LockDecision::Remain);
                return Ok(());
            }
        };

        prop_assert!(!exceeds_timeout(timeout, last, last + limit));
        prop_assert_eq!(
            decide(ActivitySignal::Visible, timeout, last, last + limit + TimeDelta::seconds(slack)),
            LockDecision::Lock
        );
    }

    /// Property: focus loss and interaction never lock
    #[test]
    fn prop_non_lock_signals(timeout in timeout_strategy(), idle_secs in 0i64..100_000) {
        let last = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let now = last + TimeDelta::seconds(idle_secs);
        prop_assert_eq!(decide(ActivitySignal::FocusLost, timeout, last, now), LockDecision::Remain);
        prop_assert_eq!(decide(ActivitySignal::Interaction, timeout, last, now), LockDecision::Remain);
    }

    /// Property: hidden locks only under the immediate policy
    #[test]
    fn prop_hidden_locks_only_when_immediate(timeout in timeout_strategy()) {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let decision = decide(ActivitySignal::Hidden, timeout, now, now);
        if timeout == LockTimeout::Immediately {
            prop_assert_eq!(decision, LockDecision::Lock);
        } else {
            prop_assert_eq!(decision, LockDecision::Deferred);
        }
    }
}
