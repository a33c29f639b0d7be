//! Durable key-value storage for the Easy Card screen lock
//!
//! Every piece of lock configuration and credential material lives behind the
//! [`LockStore`] trait: a synchronous `get` / `set` / `remove` contract whose
//! writes are visible to the very next read in the same process.
//!
//! ## Backends
//!
//! - **[`MemoryLockStore`]**: process-local map, used by tests and previews
//! - **[`SqliteLockStore`]**: single-table SQLite database with WAL journaling
//!   and versioned schema migrations
//!
//! There is no cross-key transaction. Callers doing multi-key updates remove
//! or write each key individually and must tolerate a partially applied
//! sequence after a crash.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod keys;
pub mod migrations;
pub mod store;

pub use database::SqliteLockStore;
pub use error::{Error, Result};
pub use keys::{BIOMETRIC_KEYS, SCREEN_LOCK_KEYS};
pub use store::{LockStore, MemoryLockStore};
