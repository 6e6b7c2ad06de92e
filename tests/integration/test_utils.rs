//! Shared test utilities for integration tests
//!
//! Configuration loading reads `HOME`, `AUGUR_ENV` and the API key variables, so tests that
//! touch them run serialized under one mutex and get the original values back afterwards.

use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: &[&str] = &[
    "HOME",
    "XDG_STATE_HOME",
    "AUGUR_ENV",
    "OPENAI_API_KEY",
    "NEWSAPI_KEY",
];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            ISOLATED_VARS
                .iter()
                .map(|var| (*var, std::env::var(var).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (var, value) in self.0 {
            match value {
                Some(orig) => std::env::set_var(var, orig),
                None => std::env::remove_var(var),
            }
        }
    }
}

/// Run `f` with `HOME` pointing into `test_dir` and no API keys or `AUGUR_ENV` set.
///
/// `{test_dir}/home` is created and returned to `f`; the environment is restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_STATE_HOME", test_dir.path().join("state").to_str().unwrap());
    std::env::remove_var("AUGUR_ENV");
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("NEWSAPI_KEY");

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&test_home)));

    env_state.restore();

    match result {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
