//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::profiles::ProfileStore;
use std::sync::Mutex;

/// Mutex for tests that need exclusive access to environment variables.
///
/// Use this when your test needs to:
/// 1. Temporarily change env vars to different values
/// 2. Restore env vars after the test
/// 3. Test behavior when env vars are absent
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

/// Converts string literals into owned strings
pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

/// Store with the single "brazil" profile used across tests.
///
/// This is the canonical helper for creating test stores.
pub fn brazil_store() -> ProfileStore {
    let mut store = ProfileStore::new();
    store
        .add_profile(
            "brazil",
            strings(&["200.1.2.0/24"]),
            strings(&["22", "443"]),
            "Brazil office",
        )
        .expect("valid test profile");
    store
}
