use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock a cache map, recovering the guard if a previous holder panicked.
///
/// Cache contents are disposable, so a poisoned map is still served.
pub(crate) fn lock_map<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            result = "poisoned_recovered",
            "Recovered from poisoned track cache lock"
        );
        poisoned.into_inner()
    })
}
