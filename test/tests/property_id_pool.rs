//! The bounded connection id pool under random checkout and release
//! sequences: live ids stay unique, the count never exceeds the
//! configured capacity, and released ids recycle cleanly.

use proptest::prelude::*;
use slipstream_core::{ConnectionIdPool, PoolError};

const CAPACITY: usize = 8;

proptest! {
    #[test]
    fn live_ids_stay_unique_and_bounded(
        ops in proptest::collection::vec((any::<bool>(), any::<u8>()), 1..128),
    ) {
        let mut pool = ConnectionIdPool::new(CAPACITY);
        let mut live = Vec::new();
        for (take, pick) in ops {
            if take {
                match pool.take() {
                    Ok(id) => {
                        prop_assert!(!live.contains(&id), "pool handed out {:?} twice", id);
                        live.push(id);
                    }
                    Err(PoolError::Exhausted { capacity }) => {
                        prop_assert_eq!(capacity, CAPACITY);
                        prop_assert_eq!(live.len(), CAPACITY);
                    }
                }
            } else if !live.is_empty() {
                let index = pick as usize % live.len();
                pool.put(live.swap_remove(index));
            }
            prop_assert!(live.len() <= CAPACITY);
            prop_assert_eq!(pool.in_use(), live.len());
        }
    }

    #[test]
    fn draining_and_refilling_restores_the_whole_pool(rounds in 1usize..4) {
        let mut pool = ConnectionIdPool::new(CAPACITY);
        for _ in 0..rounds {
            let mut held = Vec::new();
            for _ in 0..CAPACITY {
                held.push(pool.take().unwrap());
            }
            prop_assert_eq!(pool.in_use(), CAPACITY);
            prop_assert!(pool.take().is_err());
            for id in held.drain(..) {
                pool.put(id);
            }
            prop_assert_eq!(pool.in_use(), 0);
        }
    }
}
