// Public-API property tests (consolidated).
//
// Property 1: WeakValueMap matches a plain model under random ops.
//  - Model: per-key slot of Absent | Live(Rc) | Dead-but-present,
//    plus an insertion-order list of present keys.
//  - Invariant: get/has parity (identity of the returned Rc included),
//    len() == present count, keys() == live keys in insertion order.
//  - Operations: insert, drop-value, delete, get, sweep, clear; the
//    model mirrors the lazy-delete read policy and the sweep contract.
//
// Property 2: WeakSet enumeration matches a live-membership model.
//  - Model: per-object member flag; dropping the pool's Rc kills the
//    object outright.
//  - Invariant: iteration yields exactly the live members in insertion
//    order after every step.
use proptest::prelude::*;
use std::rc::Rc;
use weak_collections::{WeakSet, WeakValueMap};

#[derive(Clone, Debug, PartialEq)]
enum Slot {
    Absent,
    Live,
    Dead, // entry still present, value already reclaimed
}

proptest! {
    #[test]
    fn weak_value_map_matches_model(
        pool in 1usize..=6,
        ops in proptest::collection::vec((0u8..=5u8, 0usize..100), 1..120),
    ) {
        let map: WeakValueMap<usize, u32> = WeakValueMap::new();
        let mut strongs: Vec<Option<Rc<u32>>> = vec![None; pool];
        let mut state: Vec<Slot> = vec![Slot::Absent; pool];
        let mut order: Vec<usize> = Vec::new();

        for (op, raw) in ops {
            let k = raw % pool;
            match op {
                // insert: fresh Rc under key k
                0 => {
                    let v = Rc::new(raw as u32);
                    map.insert(k, &v);
                    if state[k] != Slot::Live {
                        order.retain(|&x| x != k);
                        order.push(k);
                    }
                    strongs[k] = Some(v);
                    state[k] = Slot::Live;
                }
                // drop the outside strong reference
                1 => {
                    strongs[k] = None;
                    if state[k] == Slot::Live {
                        state[k] = Slot::Dead;
                    }
                }
                // delete: true iff live
                2 => {
                    prop_assert_eq!(map.delete(&k), state[k] == Slot::Live);
                    order.retain(|&x| x != k);
                    state[k] = Slot::Absent;
                    strongs[k] = None;
                }
                // get: parity plus lazy-delete of a dead entry
                3 => {
                    let got = map.get(&k);
                    match state[k] {
                        Slot::Live => {
                            let held = strongs[k].as_ref().unwrap();
                            prop_assert!(Rc::ptr_eq(&got.unwrap(), held));
                        }
                        Slot::Dead => {
                            prop_assert!(got.is_none());
                            order.retain(|&x| x != k);
                            state[k] = Slot::Absent;
                        }
                        Slot::Absent => prop_assert!(got.is_none()),
                    }
                }
                // sweep: removes exactly the dead-but-present entries
                4 => {
                    let dead = state.iter().filter(|s| **s == Slot::Dead).count();
                    prop_assert_eq!(map.sweep(), dead);
                    for k in 0..pool {
                        if state[k] == Slot::Dead {
                            order.retain(|&x| x != k);
                            state[k] = Slot::Absent;
                        }
                    }
                }
                // clear
                5 => {
                    map.clear();
                    order.clear();
                    for k in 0..pool {
                        state[k] = Slot::Absent;
                    }
                }
                _ => unreachable!(),
            }

            // Parity after every step, via non-mutating enumeration.
            let present = state.iter().filter(|s| **s != Slot::Absent).count();
            prop_assert_eq!(map.len(), present);
            let live_keys: Vec<usize> = order
                .iter()
                .copied()
                .filter(|&k| state[k] == Slot::Live)
                .collect();
            let iterated: Vec<usize> = map.keys().collect();
            prop_assert_eq!(iterated, live_keys);
        }
    }
}

proptest! {
    #[test]
    fn weak_set_enumeration_matches_model(
        pool in 1usize..=6,
        ops in proptest::collection::vec((0u8..=3u8, 0usize..100), 1..100),
    ) {
        let set: WeakSet<u32> = WeakSet::new();
        // Pool objects carry their index as value for order checking.
        let mut objects: Vec<Option<Rc<u32>>> = (0..pool).map(|i| Some(Rc::new(i as u32))).collect();
        let mut member_order: Vec<usize> = Vec::new();

        for (op, raw) in ops {
            let i = raw % pool;
            match op {
                // add (only possible while the object exists)
                0 => {
                    if let Some(o) = &objects[i] {
                        set.add(o);
                        if !member_order.contains(&i) {
                            member_order.push(i);
                        }
                    }
                }
                // delete
                1 => {
                    if let Some(o) = &objects[i] {
                        let was_member = member_order.contains(&i);
                        prop_assert_eq!(set.delete(o), was_member);
                        member_order.retain(|&x| x != i);
                    }
                }
                // drop the object itself: membership ends with it
                2 => {
                    objects[i] = None;
                    member_order.retain(|&x| x != i);
                }
                // sweep at a random point; must not disturb live members
                3 => {
                    set.sweep();
                }
                _ => unreachable!(),
            }

            let expected: Vec<u32> = member_order.iter().map(|&x| x as u32).collect();
            let live: Vec<u32> = set.iter().map(|o| *o).collect();
            prop_assert_eq!(live, expected);
        }

        // After a final sweep, len matches live membership exactly.
        set.sweep();
        prop_assert_eq!(set.len(), member_order.len());
    }
}
