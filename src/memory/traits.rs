/*!
 * Memory Traits
 * Seams between the allocator, its page supplier, and its consumers
 */

use super::source::PageMemory;
use super::types::*;
use crate::core::types::{Address, Size, Units};

/// Supplier of fixed-size pages, the allocator's only boundary with the
/// operating system. Implementations hand out zero-filled regions of exactly
/// `page_size()` bytes and take them back on release.
pub trait PageSource: Send {
    /// Size in bytes of every page this source supplies.
    fn page_size(&self) -> Size;

    /// Acquire one zero-filled page, or fail with
    /// [`AllocError::PageSourceExhausted`].
    fn acquire_page(&mut self) -> AllocResult<PageMemory>;

    /// Return a page previously obtained from `acquire_page`.
    fn release_page(&mut self, page: PageMemory);
}

/// Allocation interface
pub trait Allocator {
    /// Register a named family with a fixed allocation unit size.
    fn register_family(&mut self, name: &str, unit_size: Size) -> AllocResult<()>;

    /// Allocate `units` units for a family, returning the address of the
    /// zero-filled usable region.
    fn allocate(&mut self, family: &str, units: Units) -> AllocResult<Address>;

    /// Release an address obtained from `allocate`.
    fn release(&mut self, address: Address) -> AllocResult<()>;
}

/// Introspection interface consumed by diagnostics
pub trait MemoryInfo {
    /// All registered families, sorted by name.
    fn families(&self) -> Vec<FamilyInfo>;

    /// Aggregate usage counters for one family.
    fn family_usage(&self, name: &str) -> AllocResult<FamilyUsage>;

    /// Address-ordered block layout of every page of one family.
    fn family_pages(&self, name: &str) -> AllocResult<Vec<PageSnapshot>>;
}
