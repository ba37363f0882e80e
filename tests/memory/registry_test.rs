/*!
 * Family registration tests
 */

use famalloc::{AllocError, MemoryManager};
use pretty_assertions::assert_eq;

#[test]
fn register_and_find_family() {
    let mut manager = MemoryManager::with_page_size(4096);
    manager.register_family("Employee", 64).unwrap();

    let family = manager.find_family("Employee").unwrap();
    assert_eq!(family.name(), "Employee");
    assert_eq!(family.unit_size(), 64);
    assert_eq!(family.page_count(), 0);

    assert!(manager.find_family("Invoice").is_none());
}

#[test]
fn duplicate_registration_fails_fatally() {
    let mut manager = MemoryManager::with_page_size(4096);
    manager.register_family("Employee", 64).unwrap();

    let err = manager.register_family("Employee", 128).unwrap_err();
    assert_eq!(err, AllocError::DuplicateFamily("Employee".to_owned()));
    assert!(err.is_usage_violation());

    // The first registration still stands.
    assert_eq!(manager.find_family("Employee").unwrap().unit_size(), 64);
}

#[test]
fn unit_size_above_capacity_is_rejected() {
    let mut manager = MemoryManager::with_page_size(4096);
    let capacity = manager.usable_capacity();

    let err = manager.register_family("Jumbo", capacity + 1).unwrap_err();
    match err {
        AllocError::UnitSizeTooLarge {
            name,
            unit_size,
            capacity: reported,
        } => {
            assert_eq!(name, "Jumbo");
            assert_eq!(unit_size, capacity + 1);
            assert_eq!(reported, capacity);
        }
        other => panic!("expected UnitSizeTooLarge, got {other:?}"),
    }
    assert!(manager.find_family("Jumbo").is_none());
}

#[test]
fn unit_size_equal_to_capacity_is_accepted() {
    let mut manager = MemoryManager::with_page_size(4096);
    let capacity = manager.usable_capacity();
    manager.register_family("Jumbo", capacity).unwrap();

    // One unit fills a fresh page exactly.
    let address = manager.allocate("Jumbo", 1).unwrap();
    assert_eq!(manager.page_count("Jumbo").unwrap(), 1);
    manager.release(address).unwrap();
    assert_eq!(manager.page_count("Jumbo").unwrap(), 0);
}

#[test]
fn over_long_family_name_is_rejected() {
    let mut manager = MemoryManager::with_page_size(4096);
    let name = "a".repeat(33);

    let err = manager.register_family(&name, 8).unwrap_err();
    assert!(matches!(err, AllocError::FamilyNameTooLong { .. }));
    assert!(manager.find_family(&name).is_none());
}

#[test]
fn families_are_listed_sorted_by_name() {
    let mut manager = MemoryManager::with_page_size(4096);
    manager.register_family("Session", 256).unwrap();
    manager.register_family("Employee", 64).unwrap();
    manager.register_family("Invoice", 128).unwrap();

    let names: Vec<_> = manager.families().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Employee", "Invoice", "Session"]);
}
