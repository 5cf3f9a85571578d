//! Indirection tokens: weak handles stamped with a per-insertion identity.
//!
//! A token answers "is your referent still alive" without keeping the
//! referent reachable. Every insertion event mints a fresh `TokenId`, so a
//! reclamation notification created for one insertion can be told apart
//! from the token currently installed under the same key. Death is
//! monotonic: once `upgrade` has failed, it fails forever.

use core::cell::Cell;
use std::rc::{Rc, Weak};

/// Identity of one insertion event. Compared, never dereferenced.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct TokenId(u64);

/// Mints strictly increasing `TokenId`s for one container instance.
#[derive(Debug)]
pub(crate) struct TokenMinter {
    next: Cell<u64>,
}

impl TokenMinter {
    pub(crate) const fn new() -> Self {
        Self { next: Cell::new(0) }
    }

    pub(crate) fn mint(&self) -> TokenId {
        let id = self.next.get();
        self.next.set(id + 1);
        TokenId(id)
    }
}

/// Weak handle to a referent plus the identity of the insertion that
/// created it. The container holds these instead of strong references.
pub(crate) struct WeakToken<R> {
    referent: Weak<R>,
    id: TokenId,
}

impl<R> WeakToken<R> {
    pub(crate) fn new(referent: &Rc<R>, id: TokenId) -> Self {
        Self {
            referent: Rc::downgrade(referent),
            id,
        }
    }

    pub(crate) fn id(&self) -> TokenId {
        self.id
    }

    /// Live referent, or `None` once it has been reclaimed.
    pub(crate) fn upgrade(&self) -> Option<Rc<R>> {
        self.referent.upgrade()
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.referent.strong_count() == 0
    }

    /// Probe for the watcher: observes liveness without minting a strong
    /// reference.
    pub(crate) fn probe(&self) -> Weak<R> {
        self.referent.clone()
    }
}
