use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Takes `mutex` even if a previous holder panicked. The poison flag is
/// cleared after the warning, so each panic is reported once.
pub(crate) fn lock_or_recover<'a, T>(
    mutex: &'a Mutex<T>,
    lock: &'static str,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(lock, "sync_lock_poisoned");
            mutex.clear_poison();
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
pub(crate) fn poison<T>(mutex: &Mutex<T>) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _held = mutex.lock();
        panic!("holder panicked");
    }));
    assert!(result.is_err());
    assert!(mutex.is_poisoned());
}
