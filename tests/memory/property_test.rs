/*!
 * Invariant property tests
 *
 * Random allocate/release traffic against a single family, auditing the
 * structure after every operation: free blocks indexed exactly while free,
 * chain continuity, and full byte accounting. Draining everything at the end
 * must hand every page back.
 */

use famalloc::MemoryManager;
use proptest::prelude::*;

const PAGE_SIZE: usize = 4096;

proptest! {
    #[test]
    fn invariants_hold_under_random_traffic(ops in proptest::collection::vec(any::<u8>(), 1..120)) {
        let mut manager = MemoryManager::with_page_size(PAGE_SIZE);
        manager.register_family("Widget", 64).unwrap();
        let mut live: Vec<usize> = Vec::new();

        for op in ops {
            if op % 4 == 0 && !live.is_empty() {
                let victim = live.remove((op as usize / 4) % live.len());
                manager.release(victim).unwrap();
            } else {
                let units = (op as usize % 8) + 1;
                live.push(manager.allocate("Widget", units).unwrap());
            }
            manager.audit("Widget").unwrap();
        }

        for address in live.drain(..) {
            manager.release(address).unwrap();
            manager.audit("Widget").unwrap();
        }
        prop_assert_eq!(manager.page_count("Widget").unwrap(), 0);

        let usage = manager.family_usage("Widget").unwrap();
        prop_assert_eq!(usage.total_blocks, 0);
        prop_assert_eq!(usage.bytes_in_use, 0);
    }

    #[test]
    fn interleaved_families_do_not_interfere(ops in proptest::collection::vec(any::<u8>(), 1..80)) {
        let mut manager = MemoryManager::with_page_size(PAGE_SIZE);
        manager.register_family("Small", 16).unwrap();
        manager.register_family("Large", 512).unwrap();
        let mut live: Vec<(usize, &str)> = Vec::new();

        for op in ops {
            match op % 5 {
                0 if !live.is_empty() => {
                    let (victim, _) = live.remove((op as usize / 5) % live.len());
                    manager.release(victim).unwrap();
                }
                1 | 2 => {
                    let units = (op as usize % 16) + 1;
                    live.push((manager.allocate("Small", units).unwrap(), "Small"));
                }
                _ => {
                    let units = (op as usize % 4) + 1;
                    live.push((manager.allocate("Large", units).unwrap(), "Large"));
                }
            }
            manager.audit("Small").unwrap();
            manager.audit("Large").unwrap();
        }

        // Every address is still readable for its full extent.
        for &(address, family) in &live {
            let unit = manager.find_family(family).unwrap().unit_size();
            prop_assert!(manager.read_bytes(address, unit).is_ok());
        }
    }
}
