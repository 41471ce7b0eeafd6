//! Serialises environment mutation in unit tests.

use std::env;

use tokio::sync::{Mutex, MutexGuard};

/// Global lock guarding process environment changes.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Holds the env mutex and restores the touched variables on drop.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets each `(key, Some(value))` and removes each `(key, None)` while
    /// holding the global mutex.
    pub async fn apply(vars: &[(&str, Option<&str>)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut saved = Vec::with_capacity(vars.len());
        for (key, wanted) in vars {
            saved.push(((*key).to_owned(), env::var(key).ok()));
            match wanted {
                Some(value) => unsafe { env::set_var(key, value) },
                None => unsafe { env::remove_var(key) },
            }
        }
        Self {
            saved,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            match previous {
                Some(value) => unsafe { env::set_var(key, value) },
                None => unsafe { env::remove_var(key) },
            }
        }
    }
}
