//! # Yielding lock
//!
//! A plain non-recursive lock with one extra: the holder may [Lock::yield_n] to let waiting threads
//! take a turn each, getting the lock back once they're done. It's what an interpreter-wide lock
//! needs when callback threads must make progress during a long owner operation.
//!
//! The state is the usual trio behind a [Mutex]: is it taken, who took it, how many are waiting.
//! Blocking is a [Condvar], threads sleep instead of spinning.
//!
//! ## Waking up
//! Condvar may wake spuriously, and a single notification may race with a newcomer grabbing the lock
//! before the woken thread gets the mutex back. So every wait is a loop over its predicate,
//! a wakeup itself means nothing.
//!
//! `release` wakes one waiter only if there's somebody waiting, there's no broadcast.
//!
//! ## Yielding
//! Yield splits an acquire into halves: give the lock away, then take it back.
//! The yielding thread counts itself as a waiter, so whoever releases the lock next wakes it up
//! (or another waiter, which then takes its own turn first).
//! To tell "somebody had a turn" from "nothing happened yet", every successful claim bumps the `grants` counter.
//!
//! There's no FIFO: any waiter may be the next one. That includes the other waiters getting the lock
//! before the yielder does, so a single turn handed out may let several waiters through.

mod error;
mod guard;
mod owner;

use std::{
    fmt,
    sync::{Condvar, Mutex, MutexGuard},
};

pub use error::LockError;
pub use guard::{LockGuard, Unlocked};
pub use owner::Owner;

#[derive(Debug, Default)]
struct State {
    taken: bool,
    /// only meaningful while taken, it keeps the last holder otherwise
    owner: Owner,
    /// threads parked in acquire or yield_n
    waiting: usize,
    /// number of successful claims so far, wraps around
    grants: u64,
}

impl State {
    fn claim(&mut self, owner: Owner) {
        self.taken = true;
        self.owner = owner;
        self.grants = self.grants.wrapping_add(1);
    }

    fn held_by(&self, owner: Owner) -> bool {
        self.taken && self.owner == owner
    }
}

#[derive(Default)]
pub struct Lock {
    state: Mutex<State>,
    wake: Condvar,
}

impl Lock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the calling thread holds the lock.
    ///
    /// Fails with [LockError::Deadlock] right away if the caller already holds it.
    pub fn acquire(&self) -> Result<(), LockError> {
        let me = Owner::current();
        let mut state = self.state.lock()?;

        if state.taken {
            if state.owner == me {
                return Err(LockError::Deadlock);
            }
            state.waiting += 1;
            while state.taken {
                state = match self.wake.wait(state) {
                    Ok(state) => state,
                    Err(poisoned) => {
                        poisoned.into_inner().waiting -= 1;
                        return Err(LockError::Internal);
                    }
                };
            }
            state.waiting -= 1;
        }

        state.claim(me);
        Ok(())
    }

    /// Frees the lock and wakes up one waiter, if any.
    ///
    /// The owner check is done under the internal mutex, so a release racing from a thread that
    /// doesn't own the lock is always turned down with [LockError::NotOwner].
    pub fn release(&self) -> Result<(), LockError> {
        let mut state = self.state.lock()?;
        if !state.held_by(Owner::current()) {
            return Err(LockError::NotOwner);
        }
        state.taken = false;
        if state.waiting > 0 {
            self.wake.notify_one();
        }
        Ok(())
    }

    /// Lets up to `count` waiting threads have the lock, one after another.
    ///
    /// Returns early once nobody waits. On success the caller holds the lock again.
    /// [LockError::Protocol] and [LockError::ReacquiredOwnSlot] mean the handoff went wrong,
    /// it's never retried. Ownership is checked under the internal mutex, like in [Lock::release].
    pub fn yield_n(&self, count: usize) -> Result<(), LockError> {
        let me = Owner::current();
        let mut state = self.state.lock()?;
        if !state.held_by(me) {
            return Err(LockError::NotOwner);
        }

        for _ in 0..count {
            if state.waiting == 0 {
                break;
            }

            let granted = state.grants;
            state.taken = false;
            state.waiting += 1;
            self.wake.notify_one();
            // wait for someone else to claim the lock and let it go
            while state.taken || state.grants == granted {
                state = self.wait_as_yielder(state)?;
            }
            state.waiting -= 1;

            // can't happen after the loop above, kept as checks on the handoff
            if state.taken {
                return Err(LockError::Protocol);
            }
            if state.owner == me {
                // the turn went nowhere, take the lock back so the caller still holds it
                state.claim(me);
                return Err(LockError::ReacquiredOwnSlot);
            }
            state.claim(me);
        }
        Ok(())
    }

    fn wait_as_yielder<'a>(
        &self,
        state: MutexGuard<'a, State>,
    ) -> Result<MutexGuard<'a, State>, LockError> {
        self.wake.wait(state).map_err(|poisoned| {
            poisoned.into_inner().waiting -= 1;
            LockError::Internal
        })
    }

    pub fn is_taken(&self) -> bool {
        self.snapshot().0
    }

    /// number of threads blocked wanting the lock right now
    pub fn waiting(&self) -> usize {
        self.snapshot().2
    }

    /// the holder, [Owner::Nobody] if the lock is free
    pub fn owner(&self) -> Owner {
        self.snapshot().1
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner().is_current()
    }

    fn snapshot(&self) -> (bool, Owner, usize) {
        // observers shouldn't fail, poisoning is reported by the operations
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let owner = if state.taken { state.owner } else { Owner::Nobody };
        (state.taken, owner, state.waiting)
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (taken, owner, waiting) = self.snapshot();
        f.debug_struct("Lock")
            .field("taken", &taken)
            .field("owner", &owner)
            .field("waiting", &waiting)
            .finish()
    }
}
