use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Lock a mutex shared with audio callbacks, taking the data back if a
/// callback panicked while holding it.
pub(crate) fn lock_or_recover<'a, T>(lock: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(context, "mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn recovers_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(Some("fault".to_string())));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        assert_eq!(
            lock_or_recover(&shared, "test").take().as_deref(),
            Some("fault")
        );
    }
}
