//! weak-collections: enumerable weak containers for single-threaded,
//! Rc-managed object graphs.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: containers whose membership tracks reachability (entries
//!   vanish without an explicit delete once their object is reclaimed)
//!   while staying enumerable and countable, which a bare weak table is
//!   not. Built in layers so each piece can be reasoned about
//!   independently.
//! - Layers:
//!   - WeakToken (token layer): a weak handle stamped with a
//!     per-insertion identity, so a stale reclamation notification can be
//!     told apart from the token currently installed under the same key.
//!   - ReclamationWatcher: registration table mapping each live token to
//!     its key context; sweep drains dead registrations for delivery,
//!     detach cancels one before it fires.
//!   - EntryIndex: hash index over slotmap record storage plus an
//!     insertion-ordered carrier of record slots; owns the full
//!     insert/overwrite/delete/clear/lookup/sweep protocol.
//!   - WeakSet / WeakKeyMap / WeakValueMap: the three public flavors over
//!     one shared core, plus read-only views and set algebra.
//!
//! Constraints
//! - Single-threaded: `Rc`/`RefCell` based, `!Send`/`!Sync` by design.
//! - Membership is by object identity (the `Rc` allocation), never value
//!   equality.
//! - Reclamation timing is not the container's to promise: `len` may
//!   overcount until a read, a sweep, or a delete observes a death.
//!
//! Why this split?
//! - Localize invariants: the two racy reconciliations, "overwrite must
//!   detach the superseded registration" and "a firing notification must
//!   match the entry's current token", each live in exactly one place.
//! - The enumeration surface never shifts live cursor positions: removal
//!   leaves a stale generational key that simply stops resolving, so
//!   iterators stay valid across arbitrary mutation from the loop body.
//!
//! Reclamation model
//! - `Rc` has no finalizer notification, so delivery is cooperative: each
//!   container's `sweep()` is the delivery point for pending
//!   notifications. Delivery is at-most-once per registration and
//!   idempotent against entries already removed or overwritten.
//!
//! Read policy
//! - Lazy-delete on read: `get`/`has` that dereference a dead token
//!   remove the stale entry on the spot (and detach its registration),
//!   bounding the overcount. Enumeration only filters dead entries and
//!   never mutates.
//!
//! Notes and non-goals
//! - No deterministic cleanup timing; no thread safety; no persistence.
//! - Containers do not implement `Clone`; read-only views provide cheap
//!   aliasing instead.
//! - Public API surface is the three containers, their views and
//!   iterators, `SetSource`, and `ObjectId`; lower layers are
//!   implementation details.

mod entry_index;
mod entry_index_proptest;
mod guard;
mod object_id;
mod token;
mod watcher;
pub mod weak_key_map;
pub mod weak_set;
pub mod weak_value_map;

// Public surface
pub use object_id::ObjectId;
pub use weak_key_map::{WeakKeyMap, WeakKeyMapView};
pub use weak_set::{SetSource, WeakSet, WeakSetView};
pub use weak_value_map::{WeakValueMap, WeakValueMapView};
