/*!
 * Allocation and release tests
 */

use famalloc::{AllocError, MemoryManager, BLOCK_HEADER_SIZE};
use pretty_assertions::assert_eq;

const PAGE_SIZE: usize = 4096;

fn manager() -> MemoryManager {
    MemoryManager::with_page_size(PAGE_SIZE)
}

#[test]
fn allocation_for_unknown_family_fails() {
    let mut manager = manager();
    let err = manager.allocate("Ghost", 1).unwrap_err();
    assert_eq!(err, AllocError::UnknownFamily("Ghost".to_owned()));
    assert!(!err.is_usage_violation());
}

#[test]
fn request_above_page_capacity_is_rejected() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();

    // Usable capacity is 4096 - 40 = 4056: 63 units fit in one request,
    // 64 units (4096 bytes) do not.
    assert!(manager.allocate("Employee", 63).is_ok());

    let err = manager.allocate("Employee", 64).unwrap_err();
    match err {
        AllocError::RequestTooLarge {
            requested,
            capacity,
        } => {
            assert_eq!(requested, 4096);
            assert_eq!(capacity, 4056);
        }
        other => panic!("expected RequestTooLarge, got {other:?}"),
    }
}

#[test]
fn consecutive_allocations_are_spaced_by_unit_plus_header() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();

    let first = manager.allocate("Employee", 1).unwrap();
    let second = manager.allocate("Employee", 1).unwrap();
    let third = manager.allocate("Employee", 1).unwrap();

    assert_eq!(second - first, 64 + BLOCK_HEADER_SIZE);
    assert_eq!(third - second, 64 + BLOCK_HEADER_SIZE);
}

#[test]
fn reused_regions_come_back_zeroed() {
    let mut manager = manager();
    manager.register_family("Buf", 8).unwrap();

    // A large block followed by a small one that keeps the page alive.
    let big = manager.allocate("Buf", 300).unwrap();
    let _small = manager.allocate("Buf", 1).unwrap();

    manager.write_bytes(big, &[0xAB; 2400]).unwrap();
    assert_eq!(manager.read_bytes(big, 2400).unwrap(), vec![0xAB; 2400]);

    manager.release(big).unwrap();

    // The freed 2400-byte block is now the family's largest free block, so
    // the next request of the same size reuses it, exactly.
    let again = manager.allocate("Buf", 300).unwrap();
    assert_eq!(again, big);
    assert_eq!(manager.read_bytes(again, 2400).unwrap(), vec![0u8; 2400]);
}

#[test]
fn hard_slack_is_absorbed_and_recovered() {
    let mut manager = manager();
    manager.register_family("Buf", 8).unwrap();

    // First carve 2000 bytes; the remaining free block holds
    // 4056 - 2000 - 40 = 2016 usable bytes.
    let first = manager.allocate("Buf", 250).unwrap();
    // 1992 of those 2016 leave a 24-byte remainder: too small for a header,
    // absorbed as invisible slack.
    let second = manager.allocate("Buf", 249).unwrap();

    let usage = manager.family_usage("Buf").unwrap();
    assert_eq!(usage.total_blocks, 2);
    assert_eq!(usage.free_blocks, 0);
    assert_eq!(usage.occupied_blocks, 2);
    manager.audit("Buf").unwrap();

    // Releasing the slack carrier recovers the hidden 24 bytes.
    manager.release(second).unwrap();
    let pages = manager.family_pages("Buf").unwrap();
    assert_eq!(pages.len(), 1);
    let freed = pages[0].blocks.last().unwrap();
    assert_eq!(freed.size, 2016);
    manager.audit("Buf").unwrap();

    manager.release(first).unwrap();
    assert_eq!(manager.page_count("Buf").unwrap(), 0);
}

#[test]
fn double_release_is_detected() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();

    let keep = manager.allocate("Employee", 1).unwrap();
    let victim = manager.allocate("Employee", 1).unwrap();
    let _tail = manager.allocate("Employee", 1).unwrap();
    manager.release(victim).unwrap();

    let err = manager.release(victim).unwrap_err();
    assert_eq!(err, AllocError::DoubleRelease(victim));
    assert!(err.is_usage_violation());

    // The structure is still sound and the other block still releasable.
    manager.audit("Employee").unwrap();
    manager.release(keep).unwrap();
}

#[test]
fn unrecognized_addresses_are_rejected() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();
    let address = manager.allocate("Employee", 1).unwrap();

    // Off by a few bytes: inside the page, but no block starts there.
    let err = manager.release(address + 8).unwrap_err();
    assert_eq!(err, AllocError::UnknownAddress(address + 8));
    assert!(err.is_usage_violation());

    // Entirely outside any page.
    let err = manager.release(0x13).unwrap_err();
    assert_eq!(err, AllocError::UnknownAddress(0x13));

    manager.audit("Employee").unwrap();
}

#[test]
fn storage_access_is_confined_to_the_block() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();
    let address = manager.allocate("Employee", 1).unwrap();
    let _second = manager.allocate("Employee", 1).unwrap();

    manager.write_bytes(address, &[7u8; 64]).unwrap();
    assert_eq!(manager.read_bytes(address, 64).unwrap(), vec![7u8; 64]);

    // One byte past the usable region.
    let err = manager.write_bytes(address, &[0u8; 65]).unwrap_err();
    assert!(matches!(err, AllocError::RangeOutOfBounds { len: 65, .. }));
    let err = manager.read_bytes(address + 32, 33).unwrap_err();
    assert!(matches!(err, AllocError::RangeOutOfBounds { .. }));

    // Released regions are no longer addressable.
    manager.release(address).unwrap();
    let err = manager.read_bytes(address, 1).unwrap_err();
    assert_eq!(err, AllocError::UnknownAddress(address));
}

#[test]
fn zero_unit_allocations_are_legal() {
    let mut manager = manager();
    manager.register_family("Employee", 64).unwrap();

    let empty = manager.allocate("Employee", 0).unwrap();
    let usage = manager.family_usage("Employee").unwrap();
    assert_eq!(usage.occupied_blocks, 1);
    assert_eq!(usage.bytes_in_use, BLOCK_HEADER_SIZE);

    manager.release(empty).unwrap();
    assert_eq!(manager.page_count("Employee").unwrap(), 0);
}
