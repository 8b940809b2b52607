//! # Scenarios
//!
//! Runnable demos of the lock: one owner thread plus workers standing in for callback threads.
//! Each one checks its own outcome and logs what happened.
//!
//! Workers are always joined and their results looked at. The owner never waits for workers
//! to park once one of them is already gone.

use std::{
    sync::atomic::{AtomicUsize, Ordering::SeqCst},
    thread::{self, scope, sleep, ScopedJoinHandle},
    time::Duration,
};

use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::lock::{Lock, LockError, LockGuard};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("{lost} of {expected} increments lost")]
    LostIncrements { lost: usize, expected: usize },
    #[error("a worker quit before blocking on the lock")]
    WorkerGone,
    #[error("a worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, Copy, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Scenario {
    Handoff,
    Contention,
    Released,
    Deadlock,
}

impl Scenario {
    pub fn run(self, lock: &Lock, workers: usize) -> Result<(), ScenarioError> {
        info!(scenario = %self, workers, "running");
        match self {
            Scenario::Handoff => handoff(lock, workers),
            Scenario::Contention => contention(lock, workers),
            Scenario::Released => released(lock, workers),
            Scenario::Deadlock => deadlock(lock),
        }
    }
}

type Worker<'scope> = ScopedJoinHandle<'scope, Result<(), LockError>>;

/// Polls until every worker is blocked on the lock.
/// Gives up with `false` as soon as one of them has finished, it would never park.
fn all_parked(lock: &Lock, workers: &[Worker<'_>]) -> bool {
    while lock.waiting() < workers.len() {
        if workers.iter().any(|w| w.is_finished()) {
            return false;
        }
        sleep(Duration::from_millis(1));
    }
    true
}

/// joins everybody, the first failure wins
fn join_all(workers: Vec<Worker<'_>>) -> Result<(), ScenarioError> {
    workers.into_iter().try_for_each(|w| {
        w.join()
            .map_err(|_| ScenarioError::WorkerPanicked)?
            .map_err(ScenarioError::from)
    })
}

fn check_total(total: usize, expected: usize) -> Result<(), ScenarioError> {
    if total == expected {
        info!(total, "no increments lost");
        Ok(())
    } else {
        warn!(total, expected, "increments lost");
        Err(ScenarioError::LostIncrements {
            lost: expected.saturating_sub(total),
            expected,
        })
    }
}

/// the owner holds the lock and hands out turns one at a time
fn handoff(lock: &Lock, workers: usize) -> Result<(), ScenarioError> {
    let turns = AtomicUsize::new(0);

    let guard = lock.lock()?;
    scope(|s| {
        let turns = &turns;
        let handles: Vec<_> = (0..workers)
            .map(move |n| {
                s.spawn(move || -> Result<(), LockError> {
                    let _g = lock.lock()?;
                    let turn = turns.fetch_add(1, SeqCst) + 1;
                    info!(worker = n, turn, "worker got its turn");
                    Ok(())
                })
            })
            .collect();

        let yielded = if all_parked(lock, &handles) {
            yield_until_idle(lock, &guard)
        } else {
            Err(ScenarioError::WorkerGone)
        };
        // let whoever is still blocked through before joining
        drop(guard);
        join_all(handles)?;
        yielded
    })?;

    info!(turns = turns.load(SeqCst), "all workers had their turn");
    Ok(())
}

fn yield_until_idle(lock: &Lock, guard: &LockGuard<'_>) -> Result<(), ScenarioError> {
    while lock.waiting() > 0 {
        debug!(waiting = lock.waiting(), "owner yields");
        guard.yield_n(1)?;
    }
    Ok(())
}

/// workers bump a plain counter under the lock, nothing gets lost
fn contention(lock: &Lock, workers: usize) -> Result<(), ScenarioError> {
    const ROUNDS: usize = 1000;
    let counter = AtomicUsize::new(0);

    scope(|s| {
        let counter = &counter;
        let handles: Vec<_> = (0..workers)
            .map(move |_| {
                s.spawn(move || -> Result<(), LockError> {
                    for _ in 0..ROUNDS {
                        let _g = lock.lock()?;
                        let v = counter.load(SeqCst);
                        counter.store(v + 1, SeqCst);
                    }
                    Ok(())
                })
            })
            .collect();
        join_all(handles)
    })?;

    check_total(counter.load(SeqCst), workers * ROUNDS)
}

/// the owner lets go of the lock around a slow call so workers aren't stuck
fn released(lock: &Lock, workers: usize) -> Result<(), ScenarioError> {
    let served = AtomicUsize::new(0);

    let mut guard = lock.lock()?;
    scope(|s| {
        let served = &served;
        let handles: Vec<_> = (0..workers)
            .map(move |n| {
                s.spawn(move || -> Result<(), LockError> {
                    let _g = lock.lock()?;
                    served.fetch_add(1, SeqCst);
                    debug!(worker = n, thread = ?thread::current().id(), "served");
                    Ok(())
                })
            })
            .collect();

        if !all_parked(lock, &handles) {
            drop(guard);
            join_all(handles)?;
            return Err(ScenarioError::WorkerGone);
        }

        let unlocked = guard.unlocked()?;
        info!("owner is busy outside of the lock");
        let joined = join_all(handles);
        drop(unlocked);
        info!(served = served.load(SeqCst), "owner holds the lock again");
        joined
    })
}

/// a second acquire from the holder is an error, not a hang
fn deadlock(lock: &Lock) -> Result<(), ScenarioError> {
    let _g = lock.lock()?;
    match lock.acquire() {
        Err(e @ LockError::Deadlock) => {
            info!(error = %e, errno = e.errno(), "self-deadlock detected");
            Ok(())
        }
        Ok(()) => Err(LockError::Protocol.into()),
        Err(e) => Err(e.into()),
    }
}
