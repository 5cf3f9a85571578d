//! Weak-referencing set: objects are members by identity while reachable.
//!
//! Membership does not keep an object alive. A member whose last outside
//! strong reference drops disappears from reads immediately and from
//! `len` once a read, a `sweep`, or an explicit delete observes it.
//! Unlike a bare weak table, the set is enumerable: iteration walks live
//! members in insertion order.

use crate::entry_index::EntryIndex;
use crate::object_id::ObjectId;
use core::cell::RefCell;
use core::fmt;
use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;
use std::rc::Rc;

type Core<T, S> = Rc<RefCell<EntryIndex<ObjectId, T, (), S>>>;

pub struct WeakSet<T, S = RandomState> {
    core: Core<T, S>,
}

impl<T> WeakSet<T> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<T> Default for WeakSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> WeakSet<T, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            core: Rc::new(RefCell::new(EntryIndex::with_hasher(hasher))),
        }
    }

    /// Number of entries. May briefly overcount members whose object is
    /// already gone but not yet observed by a read or sweep.
    pub fn len(&self) -> usize {
        self.core.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.borrow().is_empty()
    }

    /// Add an object by identity. Re-adding a live member refreshes its
    /// entry without changing its enumeration position.
    pub fn add(&self, object: &Rc<T>) {
        self.core
            .borrow_mut()
            .insert(ObjectId::of(object), object, ());
    }

    pub fn has(&self, object: &Rc<T>) -> bool {
        self.core.borrow_mut().contains(&ObjectId::of(object))
    }

    /// Remove an object. Returns whether a live member was removed.
    pub fn delete(&self, object: &Rc<T>) -> bool {
        self.core.borrow_mut().delete(&ObjectId::of(object))
    }

    pub fn clear(&self) {
        self.core.borrow_mut().clear();
    }

    /// Deliver pending reclamation notifications; returns how many
    /// entries were removed.
    pub fn sweep(&self) -> usize {
        self.core.borrow_mut().sweep()
    }

    /// Live members in insertion order. The iterator tracks the live
    /// structure: members removed before being visited are skipped,
    /// members added mid-walk may or may not be seen, and `clear` ends
    /// the walk.
    pub fn iter(&self) -> Iter<T, S> {
        Iter::new(Rc::clone(&self.core))
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Rc<T>),
    {
        for object in self.iter() {
            f(&object);
        }
    }

    /// Read-only view aliasing this set (not a snapshot).
    pub fn view(&self) -> WeakSetView<T, S> {
        WeakSetView {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T, S> WeakSet<T, S>
where
    S: BuildHasher + Clone,
{
    fn fresh(&self) -> WeakSet<T, S> {
        WeakSet::with_hasher(self.core.borrow().hasher().clone())
    }

    /// Members of `self` or `other`.
    pub fn union<O>(&self, other: &O) -> WeakSet<T, S>
    where
        O: SetSource<T> + ?Sized,
    {
        let out = self.fresh();
        for object in self.iter() {
            out.add(&object);
        }
        other.each_object(&mut |object| {
            out.add(object);
            true
        });
        out
    }

    /// Members of both `self` and `other`. Enumerates whichever operand
    /// reports fewer entries; a reported size only picks the side, it is
    /// never trusted for the answer.
    pub fn intersection<O>(&self, other: &O) -> WeakSet<T, S>
    where
        O: SetSource<T> + ?Sized,
    {
        let out = self.fresh();
        if other.reported_len().is_some_and(|n| n < self.len()) {
            other.each_object(&mut |object| {
                if self.has(object) {
                    out.add(object);
                }
                true
            });
        } else {
            for object in self.iter() {
                if other.has_object(&object) {
                    out.add(&object);
                }
            }
        }
        out
    }

    /// Members of `self` not in `other`.
    pub fn difference<O>(&self, other: &O) -> WeakSet<T, S>
    where
        O: SetSource<T> + ?Sized,
    {
        let out = self.fresh();
        for object in self.iter() {
            if !other.has_object(&object) {
                out.add(&object);
            }
        }
        out
    }

    /// Members of exactly one of `self` and `other`.
    pub fn symmetric_difference<O>(&self, other: &O) -> WeakSet<T, S>
    where
        O: SetSource<T> + ?Sized,
    {
        let out = self.fresh();
        for object in self.iter() {
            if !other.has_object(&object) {
                out.add(&object);
            }
        }
        other.each_object(&mut |object| {
            if !self.has(object) {
                out.add(object);
            }
            true
        });
        out
    }

    pub fn is_subset_of<O>(&self, other: &O) -> bool
    where
        O: SetSource<T> + ?Sized,
    {
        self.iter().all(|object| other.has_object(&object))
    }

    pub fn is_superset_of<O>(&self, other: &O) -> bool
    where
        O: SetSource<T> + ?Sized,
    {
        let mut all = true;
        other.each_object(&mut |object| {
            all = self.has(object);
            all
        });
        all
    }

    pub fn is_disjoint_from<O>(&self, other: &O) -> bool
    where
        O: SetSource<T> + ?Sized,
    {
        if other.reported_len().is_some_and(|n| n < self.len()) {
            let mut disjoint = true;
            other.each_object(&mut |object| {
                disjoint = !self.has(object);
                disjoint
            });
            disjoint
        } else {
            self.iter().all(|object| !other.has_object(&object))
        }
    }
}

impl<T, S: BuildHasher> fmt::Debug for WeakSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSet")
            .field("entries", &self.len())
            .finish()
    }
}

impl<T> FromIterator<Rc<T>> for WeakSet<T> {
    fn from_iter<I: IntoIterator<Item = Rc<T>>>(iter: I) -> Self {
        let set = WeakSet::new();
        for object in iter {
            set.add(&object);
        }
        set
    }
}

impl<T, S: BuildHasher> Extend<Rc<T>> for WeakSet<T, S> {
    fn extend<I: IntoIterator<Item = Rc<T>>>(&mut self, iter: I) {
        for object in iter {
            self.add(&object);
        }
    }
}

/// Read-only alias of a [`WeakSet`]: reflects every later mutation made
/// through the owning set.
pub struct WeakSetView<T, S = RandomState> {
    core: Core<T, S>,
}

impl<T, S> Clone for WeakSetView<T, S> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T, S> WeakSetView<T, S>
where
    S: BuildHasher,
{
    pub fn len(&self) -> usize {
        self.core.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.borrow().is_empty()
    }

    pub fn has(&self, object: &Rc<T>) -> bool {
        self.core.borrow_mut().contains(&ObjectId::of(object))
    }

    pub fn iter(&self) -> Iter<T, S> {
        Iter::new(Rc::clone(&self.core))
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Rc<T>),
    {
        for object in self.iter() {
            f(&object);
        }
    }
}

impl<T, S: BuildHasher> fmt::Debug for WeakSetView<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSetView")
            .field("entries", &self.len())
            .finish()
    }
}

/// Iterator over live members in insertion order. Holds no borrow across
/// yields, so the set may be mutated freely from the loop body.
pub struct Iter<T, S> {
    core: Core<T, S>,
    cursor: usize,
}

impl<T, S> Iter<T, S> {
    fn new(core: Core<T, S>) -> Self {
        core.borrow().begin_iteration();
        Self { core, cursor: 0 }
    }
}

impl<T, S: BuildHasher> Iterator for Iter<T, S> {
    type Item = Rc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let core = self.core.borrow();
            if self.cursor >= core.order_len() {
                return None;
            }
            let pos = self.cursor;
            self.cursor += 1;
            if let Some((_, object, _)) = core.resolve_at(pos) {
                return Some(object);
            }
        }
    }
}

impl<T, S> Drop for Iter<T, S> {
    fn drop(&mut self) {
        self.core.borrow().end_iteration();
    }
}

/// Operand for binary set operations: the weak set itself, its view, or
/// any ordinary strong collection of objects.
pub trait SetSource<T> {
    /// Identity membership test.
    fn has_object(&self, object: &Rc<T>) -> bool;

    /// Entry count, if this source reports one. Only ever used to choose
    /// which operand to enumerate; an externally owned collection cannot
    /// promise a live count, so correctness never rests on it.
    fn reported_len(&self) -> Option<usize>;

    /// Visit each object; the visitor returns false to stop early.
    fn each_object(&self, f: &mut dyn FnMut(&Rc<T>) -> bool);
}

impl<T, S: BuildHasher> SetSource<T> for WeakSet<T, S> {
    fn has_object(&self, object: &Rc<T>) -> bool {
        self.has(object)
    }

    fn reported_len(&self) -> Option<usize> {
        Some(self.len())
    }

    fn each_object(&self, f: &mut dyn FnMut(&Rc<T>) -> bool) {
        for object in self.iter() {
            if !f(&object) {
                return;
            }
        }
    }
}

impl<T, S: BuildHasher> SetSource<T> for WeakSetView<T, S> {
    fn has_object(&self, object: &Rc<T>) -> bool {
        self.has(object)
    }

    fn reported_len(&self) -> Option<usize> {
        Some(self.len())
    }

    fn each_object(&self, f: &mut dyn FnMut(&Rc<T>) -> bool) {
        for object in self.iter() {
            if !f(&object) {
                return;
            }
        }
    }
}

impl<T> SetSource<T> for [Rc<T>] {
    fn has_object(&self, object: &Rc<T>) -> bool {
        self.iter().any(|o| Rc::ptr_eq(o, object))
    }

    fn reported_len(&self) -> Option<usize> {
        Some(self.len())
    }

    fn each_object(&self, f: &mut dyn FnMut(&Rc<T>) -> bool) {
        for object in self {
            if !f(object) {
                return;
            }
        }
    }
}

impl<T> SetSource<T> for Vec<Rc<T>> {
    fn has_object(&self, object: &Rc<T>) -> bool {
        self.as_slice().has_object(object)
    }

    fn reported_len(&self) -> Option<usize> {
        Some(self.len())
    }

    fn each_object(&self, f: &mut dyn FnMut(&Rc<T>) -> bool) {
        self.as_slice().each_object(f)
    }
}
