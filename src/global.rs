//! # The process-wide lock
//!
//! One [Lock] for the whole process, set up once by [init_lock]. [OnceLock] is the one-time barrier:
//! whatever thread initializes it, everybody else sees a fully built lock afterwards.
//!
//! Using it before [init_lock] is an error rather than a silent lazy init.

use std::sync::OnceLock;

use crate::lock::{Lock, LockError};

static LOCK: OnceLock<Lock> = OnceLock::new();

/// Can be called any number of times from any thread, only the first call builds the lock.
pub fn init_lock() -> &'static Lock {
    LOCK.get_or_init(Lock::new)
}

pub fn global() -> Result<&'static Lock, LockError> {
    LOCK.get().ok_or(LockError::Uninitialized)
}

pub fn acquire() -> Result<(), LockError> {
    global()?.acquire()
}

pub fn release() -> Result<(), LockError> {
    global()?.release()
}

pub fn yield_n(count: usize) -> Result<(), LockError> {
    global()?.yield_n(count)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{ptr, thread::scope};

    // the only test touching the static, so there's no ordering between tests to care about
    #[test]
    fn test_global() {
        assert_eq!(global().err(), Some(LockError::Uninitialized));
        assert_eq!(acquire(), Err(LockError::Uninitialized));

        // racing initializers all end up with the same lock
        let locks: Vec<&'static Lock> = scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(init_lock)).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(locks.iter().all(|l| ptr::eq(*l, locks[0])));

        // end-to-end through the free functions
        assert_eq!(acquire(), Ok(()));
        assert_eq!(yield_n(1), Ok(()));
        assert_eq!(release(), Ok(()));
        assert_eq!(release(), Err(LockError::NotOwner));
    }
}
