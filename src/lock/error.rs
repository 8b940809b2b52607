//! # Errors
//!
//! Every failure is a value returned to the caller. Each kind also has a system error number,
//! so callers speaking errno (e.g. a filesystem binding) can pass it through as is.

use std::io;

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// the caller already holds the lock
    #[error("lock is already held by the calling thread")]
    Deadlock,
    /// release / yield by a thread not holding the lock, or on a free lock
    #[error("lock is not held by the calling thread")]
    NotOwner,
    /// a yield handoff ended with the lock still taken by someone else
    #[error("yield handoff left the lock taken")]
    Protocol,
    /// a yield handoff gave the turn back to the yielding thread itself
    #[error("yield handoff returned the lock to the yielding thread")]
    ReacquiredOwnSlot,
    /// the internal mutex got poisoned
    #[error("internal lock state is poisoned")]
    Internal,
    #[error("process-wide lock used before init_lock()")]
    Uninitialized,
}

impl LockError {
    pub fn errno(&self) -> i32 {
        match self {
            LockError::Deadlock => libc::EDEADLK,
            LockError::NotOwner => libc::EPERM,
            LockError::Protocol => libc::EPROTO,
            LockError::ReacquiredOwnSlot => libc::ENOMSG,
            LockError::Internal => libc::EOWNERDEAD,
            LockError::Uninitialized => libc::EINVAL,
        }
    }
}

/// a poisoned guard mutex is reported, the lock doesn't try to recover
impl<T> From<std::sync::PoisonError<T>> for LockError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LockError::Internal
    }
}

impl From<LockError> for io::Error {
    fn from(e: LockError) -> Self {
        io::Error::from_raw_os_error(e.errno())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_errno() {
        assert_eq!(LockError::Deadlock.errno(), libc::EDEADLK);
        assert_eq!(LockError::NotOwner.errno(), libc::EPERM);
        assert_eq!(LockError::Protocol.errno(), libc::EPROTO);
        assert_eq!(LockError::ReacquiredOwnSlot.errno(), libc::ENOMSG);

        let io: io::Error = LockError::NotOwner.into();
        assert_eq!(io.raw_os_error(), Some(libc::EPERM));
    }

    #[test]
    fn test_poison() {
        let m = std::sync::Mutex::new(());
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _g = m.lock().unwrap();
                panic!("poison it");
            })
            .join()
        });
        let e: LockError = m.lock().unwrap_err().into();
        assert_eq!(e, LockError::Internal);
    }
}
