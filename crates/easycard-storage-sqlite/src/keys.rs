//! Persisted key catalogue
//!
//! Key names are shared with earlier releases of the app so existing
//! profiles keep working after an upgrade. No component outside the lock
//! subsystem should read or write these keys directly.

/// Lock enabled flag (`"true"` / `"false"`)
pub const SCREEN_LOCK_ENABLED: &str = "screen_lock_enabled";

/// Passcode digest (PHC string)
pub const SCREEN_LOCK_PASSCODE: &str = "screen_lock_passcode";

/// Biometric unlock enabled flag
pub const SCREEN_LOCK_BIOMETRIC: &str = "screen_lock_biometric";

/// Timeout policy selector
pub const SCREEN_LOCK_TIMEOUT: &str = "screen_lock_timeout";

/// Last activity timestamp (Unix epoch milliseconds)
pub const SCREEN_LOCK_LAST_ACTIVITY: &str = "screen_lock_last_activity";

/// Hide sensitive data flag
pub const SCREEN_LOCK_HIDE_DATA: &str = "screen_lock_hide_data";

/// Lock paused flag
pub const SCREEN_LOCK_PAUSED: &str = "screen_lock_paused";

/// Biometric credential record (JSON: credential reference + bound identity)
pub const BIOMETRIC_CREDENTIAL: &str = "biometric_credential";

/// Identity bound to the biometric credential
pub const BIOMETRIC_PHONE: &str = "biometric_phone";

/// Obfuscated secondary secret
pub const BIOMETRIC_PASSWORD: &str = "biometric_password";

/// Every key owned by the lock configuration.
pub const SCREEN_LOCK_KEYS: [&str; 7] = [
    SCREEN_LOCK_PASSCODE,
    SCREEN_LOCK_ENABLED,
    SCREEN_LOCK_BIOMETRIC,
    SCREEN_LOCK_TIMEOUT,
    SCREEN_LOCK_LAST_ACTIVITY,
    SCREEN_LOCK_HIDE_DATA,
    SCREEN_LOCK_PAUSED,
];

/// Every key owned by the biometric credential.
pub const BIOMETRIC_KEYS: [&str; 3] = [BIOMETRIC_CREDENTIAL, BIOMETRIC_PHONE, BIOMETRIC_PASSWORD];
