//! # Scoped helpers
//!
//! [LockGuard] holds the lock until dropped, [Unlocked] is the opposite: the lock is let go
//! for as long as it lives and taken back on drop. The latter is for running a blocking call
//! from inside a locked section without starving everybody else.
//!
//! Drop can't return anything, so a failure there is only logged.
//!
//! Both are `!Send`: the lock is owned by a thread, so releasing (or retaking) it has to happen
//! on the thread that created the value, same as [std::sync::MutexGuard].

use std::marker::PhantomData;

use tracing::error;

use super::{Lock, LockError};

/// Guard structure to ease ownership and usage
///
/// It stays on the thread holding the lock:
///
/// ```compile_fail
/// let lock = yield_lock::Lock::new();
/// let g = lock.lock().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(g));
/// });
/// ```
#[must_use = "the lock is released right away if the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
    // raw pointer makes it !Send
    _not_send: PhantomData<*const ()>,
}

impl Lock {
    /// [Lock::acquire] tied to a scope
    pub fn lock(&self) -> Result<LockGuard<'_>, LockError> {
        self.acquire()?;
        Ok(LockGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Releases the lock held by the caller until the returned value is dropped.
    pub fn unlocked(&self) -> Result<Unlocked<'_>, LockError> {
        self.release()?;
        Ok(Unlocked {
            lock: self,
            _not_send: PhantomData,
        })
    }
}

impl LockGuard<'_> {
    /// see [Lock::yield_n]
    pub fn yield_n(&self, count: usize) -> Result<(), LockError> {
        self.lock.yield_n(count)
    }

    /// Lets go of the lock while the returned value lives, the guard is back in force afterwards.
    pub fn unlocked(&mut self) -> Result<Unlocked<'_>, LockError> {
        self.lock.unlocked()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            error!(error = %e, errno = e.errno(), "failed to release lock on guard drop");
        }
    }
}

/// Reacquires on drop, so it can't travel to another thread either:
///
/// ```compile_fail
/// let lock = yield_lock::Lock::new();
/// lock.acquire().unwrap();
/// let u = lock.unlocked().unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(u));
/// });
/// ```
#[must_use = "the lock is taken back right away if this is dropped"]
pub struct Unlocked<'a> {
    lock: &'a Lock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for Unlocked<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.acquire() {
            error!(error = %e, errno = e.errno(), "failed to reacquire lock after unlocked scope");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        sync::atomic::{AtomicBool, Ordering::SeqCst},
        thread::{scope, sleep},
        time::Duration,
    };

    #[test]
    fn test_guard_releases() {
        let lock = Lock::new();
        {
            let _g = lock.lock().unwrap();
            assert!(lock.is_held_by_current_thread());
            assert_eq!(lock.acquire(), Err(LockError::Deadlock));
        }
        assert!(!lock.is_taken());
    }

    #[test]
    fn test_guard_dropped_on_its_own_thread() {
        let lock = Lock::new();
        scope(|s| {
            s.spawn(|| {
                let g = lock.lock().unwrap();
                assert!(lock.is_held_by_current_thread());
                drop(g);
            });
        });
        assert!(!lock.is_taken());
        // the lock is free for anyone afterwards
        let _g = lock.lock().unwrap();
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn test_unlocked_lets_others_in() {
        let lock = Lock::new();
        let worker_done = AtomicBool::new(false);

        let mut g = lock.lock().unwrap();
        scope(|s| {
            s.spawn(|| {
                let _g = lock.lock().unwrap();
                worker_done.store(true, SeqCst);
            });
            while lock.waiting() == 0 {
                sleep(Duration::from_millis(1));
            }

            {
                let _u = g.unlocked().unwrap();
                while !worker_done.load(SeqCst) {
                    sleep(Duration::from_millis(1));
                }
            }
            // back in
            assert!(lock.is_held_by_current_thread());
            assert_eq!(g.yield_n(1), Ok(()));
        });
        drop(g);
        assert!(!lock.is_taken());
    }

    #[test]
    fn test_unlocked_requires_owner() {
        let lock = Lock::new();
        assert!(matches!(lock.unlocked(), Err(LockError::NotOwner)));
    }
}
