pub mod global;
pub mod lock;
pub mod scenarios;

pub use global::{global, init_lock};
pub use lock::{Lock, LockError, LockGuard, Owner, Unlocked};
