//! Reclamation watcher: registration table for not-yet-delivered
//! reclamation notifications.
//!
//! One registration per live token, carrying the index key as matching
//! context. `sweep` drains registrations whose referent has been reclaimed
//! and hands back `(context, token)` pairs for delivery; a drained
//! registration can never fire again. `detach` makes a registration inert
//! before it fires, which is how overwrite/delete/clear cancel a pending
//! notification for a superseded token.

use crate::token::TokenId;
use slotmap::{DefaultKey, SlotMap};
use std::rc::Weak;

/// Stable handle to one registration; detaching twice is a harmless miss
/// thanks to the generational key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct RegId(DefaultKey);

struct Registration<R, C> {
    /// Weak probe on the referent; liveness only, never upgraded.
    probe: Weak<R>,
    /// Identity of the insertion event this registration was created for.
    token: TokenId,
    /// Matching context handed back on delivery.
    context: C,
}

pub(crate) struct ReclamationWatcher<R, C> {
    regs: SlotMap<DefaultKey, Registration<R, C>>,
}

impl<R, C: Clone> ReclamationWatcher<R, C> {
    pub(crate) fn new() -> Self {
        Self {
            regs: SlotMap::with_key(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.regs.len()
    }

    pub(crate) fn register(&mut self, probe: Weak<R>, token: TokenId, context: C) -> RegId {
        RegId(self.regs.insert(Registration {
            probe,
            token,
            context,
        }))
    }

    /// Cancel a pending registration. Returns false if it already fired or
    /// was detached before.
    pub(crate) fn detach(&mut self, id: RegId) -> bool {
        self.regs.remove(id.0).is_some()
    }

    pub(crate) fn detach_all(&mut self) {
        self.regs.clear();
    }

    /// Drain registrations whose referent is gone. Each fires exactly once:
    /// the registration is removed as its `(context, token)` pair is
    /// collected. Order of delivery is unspecified.
    pub(crate) fn sweep(&mut self) -> Vec<(C, TokenId)> {
        let mut fired = Vec::new();
        self.regs.retain(|_, reg| {
            if reg.probe.strong_count() == 0 {
                fired.push((reg.context.clone(), reg.token));
                false
            } else {
                true
            }
        });
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenMinter;
    use std::rc::Rc;

    fn probe_of<T>(rc: &Rc<T>) -> Weak<T> {
        Rc::downgrade(rc)
    }

    /// Invariant: a registration fires at most once; a second sweep after
    /// delivery finds nothing.
    #[test]
    fn fires_at_most_once() {
        let minter = TokenMinter::new();
        let mut w: ReclamationWatcher<u32, &'static str> = ReclamationWatcher::new();
        let obj = Rc::new(1u32);
        let tok = minter.mint();
        w.register(probe_of(&obj), tok, "k");

        assert!(w.sweep().is_empty(), "live referent must not fire");
        drop(obj);

        let fired = w.sweep();
        assert_eq!(fired, vec![("k", tok)]);
        assert!(w.sweep().is_empty(), "a drained registration never refires");
        assert_eq!(w.len(), 0);
    }

    /// Invariant: a detached registration is inert; the referent dying
    /// afterwards delivers nothing.
    #[test]
    fn detach_makes_firing_inert() {
        let minter = TokenMinter::new();
        let mut w: ReclamationWatcher<u32, u8> = ReclamationWatcher::new();
        let obj = Rc::new(2u32);
        let id = w.register(probe_of(&obj), minter.mint(), 7);

        assert!(w.detach(id));
        assert!(!w.detach(id), "second detach is a miss");
        drop(obj);
        assert!(w.sweep().is_empty());
    }

    /// Invariant: sweeping delivers only the dead registrations and leaves
    /// live ones pending.
    #[test]
    fn sweep_is_selective() {
        let minter = TokenMinter::new();
        let mut w: ReclamationWatcher<u32, u8> = ReclamationWatcher::new();
        let a = Rc::new(1u32);
        let b = Rc::new(2u32);
        w.register(probe_of(&a), minter.mint(), 1);
        w.register(probe_of(&b), minter.mint(), 2);

        drop(a);
        let fired = w.sweep();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 1);
        assert_eq!(w.len(), 1);

        drop(b);
        let fired = w.sweep();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, 2);
        assert_eq!(w.len(), 0);
    }

    /// Invariant: detach_all empties the table; nothing fires after a
    /// clear even once every referent dies.
    #[test]
    fn detach_all_cancels_everything() {
        let minter = TokenMinter::new();
        let mut w: ReclamationWatcher<u32, u8> = ReclamationWatcher::new();
        let objs: Vec<_> = (0..4).map(Rc::new).collect();
        for (i, o) in objs.iter().enumerate() {
            w.register(probe_of(o), minter.mint(), i as u8);
        }
        assert_eq!(w.len(), 4);

        w.detach_all();
        drop(objs);
        assert!(w.sweep().is_empty());
    }
}
