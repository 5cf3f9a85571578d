//! Shared core: strong index over weak tokens, insertion-ordered
//! enumeration surface, and the reclamation protocol.
//!
//! One `EntryIndex` instance backs one container. It owns three structures
//! that every mutation must leave mutually consistent before returning:
//!
//! - `index`: hash table from the container's key space to a record slot;
//! - `order`: insertion-ordered carrier of record slots, walked by
//!   enumeration. Removal leaves a stale generational key behind; stale
//!   keys no longer resolve in `slots` and are skipped, so live cursors
//!   stay valid without shifting positions;
//! - `watcher`: one reclamation registration per installed token.
//!
//! Protocol rules enforced here:
//!
//! - Overwriting a live key detaches the superseded token's registration
//!   *before* installing the new token, so a pending notification for the
//!   old token can never remove the new entry.
//! - Delivery double-checks token identity: a notification whose token id
//!   differs from the entry's current token is inert.
//! - Read policy is lazy-delete: `lookup`/`contains` that hit a dead token
//!   remove the stale entry (detaching its registration) and report
//!   absent. Enumeration only filters and never mutates.

use crate::guard::DebugReentrancy;
use crate::token::{TokenId, TokenMinter, WeakToken};
use crate::watcher::{RegId, ReclamationWatcher};
use core::borrow::Borrow;
use core::cell::Cell;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::rc::Rc;

struct Record<K, R, P> {
    key: K,
    /// Hash stored at insertion; `K: Hash` never runs again for this entry.
    hash: u64,
    token: WeakToken<R>,
    payload: P,
    reg: RegId,
}

pub(crate) struct EntryIndex<K, R, P, S> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Record<K, R, P>>,
    order: Vec<DefaultKey>,
    watcher: ReclamationWatcher<R, K>,
    minter: TokenMinter,
    guard: DebugReentrancy,
    /// Live enumeration cursors; order compaction is deferred while > 0.
    iterating: Cell<usize>,
}

impl<K, R, P, S> EntryIndex<K, R, P, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            order: Vec::new(),
            watcher: ReclamationWatcher::new(),
            minter: TokenMinter::new(),
            guard: DebugReentrancy::new(),
            iterating: Cell::new(0),
        }
    }

    pub(crate) fn hasher(&self) -> &S {
        &self.hasher
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Number of index entries. May overcount live entries: a dead token
    /// stays counted until a read, a sweep, or an explicit delete removes
    /// it. Declared behavior, not a defect.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn probe<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.probe_hashed(self.make_hash(q), q)
    }

    fn probe_hashed<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index
            .find(hash, |&kk| {
                self.slots
                    .get(kk)
                    .map(|rec| rec.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    /// Unlink one record from index and slots, detaching its registration.
    /// Its order position goes stale and is skipped by enumeration.
    fn remove_slot(&mut self, slot: DefaultKey) -> Record<K, R, P> {
        let rec = self
            .slots
            .remove(slot)
            .expect("record must exist while its slot is referenced");
        self.watcher.detach(rec.reg);
        self.index
            .find_entry(rec.hash, |&kk| kk == slot)
            .expect("index entry must exist for a live record")
            .remove();
        rec
    }

    fn append(&mut self, key: K, hash: u64, referent: &Rc<R>, payload: P) {
        let token = WeakToken::new(referent, self.minter.mint());
        let reg = self
            .watcher
            .register(token.probe(), token.id(), key.clone());
        let slot = self.slots.insert(Record {
            key,
            hash,
            token,
            payload,
            reg,
        });
        self.index.insert_unique(hash, slot, |&kk| {
            self.slots.get(kk).map(|rec| rec.hash).unwrap_or(0)
        });
        self.order.push(slot);
    }

    /// Insert or overwrite. A live prior entry keeps its enumeration
    /// position and gets a fresh token; a dead prior entry is dropped and
    /// the key re-enters at the end, as a fresh insertion would.
    pub(crate) fn insert(&mut self, key: K, referent: &Rc<R>, payload: P) {
        let _g = self.guard.enter();
        let hash = self.make_hash(&key);
        match self.probe_hashed(hash, &key) {
            Some(slot) if !self.slots[slot].token.is_dead() => {
                let old_reg = self.slots[slot].reg;
                self.watcher.detach(old_reg);
                let token = WeakToken::new(referent, self.minter.mint());
                let reg = self.watcher.register(token.probe(), token.id(), key);
                let rec = &mut self.slots[slot];
                rec.token = token;
                rec.payload = payload;
                rec.reg = reg;
            }
            Some(stale) => {
                self.remove_slot(stale);
                self.append(key, hash, referent, payload);
                self.maybe_compact();
            }
            None => self.append(key, hash, referent, payload),
        }
    }

    /// Resolve a key to its live referent and payload. A dead token is
    /// absent even if its notification has not fired yet; per the read
    /// policy the stale entry is removed on the spot.
    pub(crate) fn lookup<Q>(&mut self, q: &Q) -> Option<(Rc<R>, &P)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let slot = self.probe(q)?;
        let upgraded = self.slots[slot].token.upgrade();
        match upgraded {
            Some(referent) => Some((referent, &self.slots[slot].payload)),
            None => {
                self.remove_slot(slot);
                self.maybe_compact();
                None
            }
        }
    }

    pub(crate) fn contains<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.lookup(q).is_some()
    }

    /// Remove a key. Returns whether a *live* entry was removed; a record
    /// whose token already died is cleaned up but reported as absent,
    /// matching what a read would have said.
    pub(crate) fn delete<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        match self.probe(q) {
            Some(slot) => {
                let was_live = !self.slots[slot].token.is_dead();
                self.remove_slot(slot);
                self.maybe_compact();
                was_live
            }
            None => false,
        }
    }

    /// Detach every registration, then discard index, slots, and order.
    /// Single-threaded, so no intermediate state is observable; pending
    /// notifications for anything cleared here are inert.
    pub(crate) fn clear(&mut self) {
        let _g = self.guard.enter();
        self.watcher.detach_all();
        self.index.clear();
        self.slots.clear();
        self.order.clear();
    }

    /// Cooperative delivery point for reclamation notifications: drains
    /// the watcher's dead registrations and applies each to the index.
    /// Returns the number of entries removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let _g = self.guard.enter();
        let fired = self.watcher.sweep();
        let mut removed = 0;
        for (key, token) in fired {
            if self.deliver(&key, token) {
                removed += 1;
            }
        }
        self.maybe_compact();
        removed
    }

    /// Apply one reclamation notification. No-op if the key is gone
    /// (explicit delete/clear won) or if the entry's current token differs
    /// from the firing one (the key was overwritten; the notification is
    /// stale and must not clobber the new entry).
    pub(crate) fn deliver(&mut self, key: &K, token: TokenId) -> bool {
        let Some(slot) = self.probe(key) else {
            return false;
        };
        if self.slots[slot].token.id() != token {
            return false;
        }
        self.remove_slot(slot);
        true
    }

    /// Current token identity for a key, dead or alive. Test hook for the
    /// delivery guard.
    #[cfg(test)]
    pub(crate) fn current_token<Q>(&self, q: &Q) -> Option<TokenId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.probe(q).map(|slot| self.slots[slot].token.id())
    }

    #[cfg(test)]
    pub(crate) fn watcher_len(&self) -> usize {
        self.watcher.len()
    }

    // --- enumeration surface ---

    pub(crate) fn order_len(&self) -> usize {
        self.order.len()
    }

    /// Resolve one enumeration position: `None` for a stale position
    /// (removed record) or a dead token, both silently skipped by cursors.
    pub(crate) fn resolve_at(&self, pos: usize) -> Option<(&K, Rc<R>, &P)> {
        let _g = self.guard.enter();
        let slot = *self.order.get(pos)?;
        let rec = self.slots.get(slot)?;
        let referent = rec.token.upgrade()?;
        Some((&rec.key, referent, &rec.payload))
    }

    /// Drop stale order positions once they dominate. Deferred while any
    /// cursor is live, since compaction shifts positions.
    fn maybe_compact(&mut self) {
        if self.iterating.get() == 0
            && self.order.len() > 8
            && self.order.len() >= self.slots.len() * 2
        {
            let slots = &self.slots;
            self.order.retain(|&slot| slots.contains_key(slot));
        }
    }
}

// Cursor registration carries no bounds so iterator Drop impls can call it.
impl<K, R, P, S> EntryIndex<K, R, P, S> {
    pub(crate) fn begin_iteration(&self) {
        self.iterating.set(self.iterating.get() + 1);
    }

    pub(crate) fn end_iteration(&self) {
        let n = self.iterating.get();
        debug_assert!(n > 0);
        self.iterating.set(n.saturating_sub(1));
    }
}
