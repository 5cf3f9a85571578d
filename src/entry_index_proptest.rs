#![cfg(test)]

// Property tests for the shared core kept inside the crate so they can
// check internal invariants (watcher size, order carrier) without feature
// gates. Random op sequences run against a plain model: a key -> liveness
// map plus an insertion-order list, mirroring the lazy-delete read policy.

use crate::entry_index::EntryIndex;
use proptest::prelude::*;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::rc::Rc;

type Core = EntryIndex<String, u32, (), RandomState>;

#[derive(Debug)]
struct Model {
    // key -> still-live referent held here strongly (None once dropped)
    strongs: HashMap<String, Option<Rc<u32>>>,
    // keys with an index entry, in enumeration order
    order: Vec<String>,
}

impl Model {
    fn new() -> Self {
        Self {
            strongs: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn present(&self, k: &str) -> bool {
        self.order.iter().any(|x| x == k)
    }

    fn live(&self, k: &str) -> bool {
        self.present(k) && matches!(self.strongs.get(k), Some(Some(_)))
    }

    fn remove(&mut self, k: &str) {
        self.order.retain(|x| x != k);
    }
}

fn keys_in_order(c: &Core) -> Vec<String> {
    (0..c.order_len())
        .filter_map(|pos| c.resolve_at(pos).map(|(k, _, _)| k.clone()))
        .collect()
}

proptest! {
    // Ops: 0 insert, 1 drop referent, 2 delete, 3 lookup, 4 sweep, 5 clear.
    // Pool-indexed keys shrink toward earlier keys and shorter sequences.
    #[test]
    fn core_matches_model(
        pool in 1usize..=6,
        ops in proptest::collection::vec((0u8..=5u8, 0usize..100), 1..120),
    ) {
        let mut core: Core = EntryIndex::with_hasher(RandomState::new());
        let mut model = Model::new();

        for (op, raw) in ops {
            let k = format!("k{}", raw % pool);
            match op {
                0 => {
                    let obj = Rc::new(raw as u32);
                    core.insert(k.clone(), &obj, ());
                    if model.live(&k) {
                        // overwrite in place: order unchanged
                    } else {
                        // fresh or dead-prior: (re-)append at the end
                        model.remove(&k);
                        model.order.push(k.clone());
                    }
                    model.strongs.insert(k.clone(), Some(obj));
                }
                1 => {
                    if let Some(slot) = model.strongs.get_mut(&k) {
                        *slot = None; // referent reclaimed; entry lingers
                    }
                }
                2 => {
                    let expect = model.live(&k);
                    prop_assert_eq!(core.delete(&k), expect);
                    model.remove(&k);
                }
                3 => {
                    let got = core.lookup(&k).map(|(rc, _)| rc);
                    if model.live(&k) {
                        let held = model.strongs[&k].as_ref().unwrap();
                        let got = got.expect("live entry must resolve");
                        prop_assert!(Rc::ptr_eq(&got, held));
                    } else {
                        prop_assert!(got.is_none());
                        // lazy-delete: a failed read removes the record
                        model.remove(&k);
                    }
                }
                4 => {
                    let dead: Vec<String> = model
                        .order
                        .iter()
                        .filter(|k| !model.live(k))
                        .cloned()
                        .collect();
                    prop_assert_eq!(core.sweep(), dead.len());
                    for k in dead {
                        model.remove(&k);
                    }
                }
                5 => {
                    core.clear();
                    model.order.clear();
                }
                _ => unreachable!(),
            }

            // Structural parity after every step, through the non-mutating
            // enumeration path so dead-but-unobserved entries stay put for
            // later sweep/lookup ops to exercise.
            prop_assert_eq!(core.len(), model.order.len());
            prop_assert_eq!(core.watcher_len(), core.len(), "registration leak");
            let live_order: Vec<String> = model
                .order
                .iter()
                .filter(|k| model.live(k))
                .cloned()
                .collect();
            prop_assert_eq!(keys_in_order(&core), live_order);
        }
    }
}
