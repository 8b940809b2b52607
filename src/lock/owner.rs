//! # Owner identity
//!
//! The lock only needs to tell threads apart, so the owner is a [ThreadId] and nothing more.
//! [Owner::Nobody] is the sentinel for a free lock, it never compares equal to a real thread.

use std::{
    fmt,
    thread::{self, ThreadId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Owner {
    #[default]
    Nobody,
    Thread(ThreadId),
}

impl Owner {
    /// identity of the calling thread
    pub fn current() -> Self {
        Owner::Thread(thread::current().id())
    }

    /// true if this is the calling thread
    pub fn is_current(&self) -> bool {
        *self == Self::current()
    }

    pub fn is_nobody(&self) -> bool {
        matches!(self, Owner::Nobody)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Nobody => f.write_str("nobody"),
            Owner::Thread(id) => write!(f, "{id:?}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread::spawn;

    #[test]
    fn test_identity() {
        let me = Owner::current();
        assert!(me.is_current());
        assert_eq!(me, Owner::current());

        // another thread is someone else
        let other = spawn(Owner::current).join().unwrap();
        assert_ne!(me, other);
        assert!(!other.is_current());
    }

    #[test]
    fn test_nobody_is_nobody() {
        assert!(Owner::Nobody.is_nobody());
        assert!(!Owner::Nobody.is_current());
        assert_ne!(Owner::Nobody, Owner::current());
        assert_eq!(Owner::default(), Owner::Nobody);
        assert_eq!(Owner::Nobody.to_string(), "nobody");
    }
}
