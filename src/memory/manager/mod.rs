/*!
 * Memory Management
 *
 * Page-family memory manager: named families acquire fixed-size pages from a
 * [`PageSource`], carve them into variably sized blocks on demand, track free
 * space with a per-family size-sorted index, and coalesce adjacent free
 * blocks on release.
 *
 * ## Allocation behavior
 *
 * - **Largest-first**: every request is satisfied from the head of the
 *   family's free index, the largest free block family-wide; a new page is
 *   acquired only when that head cannot hold the request.
 * - **Block splitting**: the chosen block is cut down to the requested size;
 *   a remainder big enough for a header becomes a new free block, a smaller
 *   one is absorbed as hard slack and recovered at release time.
 * - **Coalescing**: releasing a block merges it with free neighbors in both
 *   directions; a page whose chain collapses to one free block goes straight
 *   back to the page source.
 * - **Zero-fill**: allocated regions are zeroed before their address is
 *   returned.
 *
 * The manager is an explicit value owned by the caller — no global state —
 * and every operation takes `&mut self`: it is a single-threaded structure
 * and sharing it across threads is the caller's responsibility.
 */

mod alloc;
mod lifecycle;
mod stats;
mod storage;

use ahash::RandomState;
use log::info;
use std::collections::HashMap;

use crate::core::types::{Address, Size, Units};

use super::page::{Page, PageId};
use super::registry::FamilyRegistry;
use super::source::HeapPageSource;
use super::traits::{Allocator, MemoryInfo, PageSource};
use super::types::{
    AllocResult, FamilyInfo, FamilyUsage, PageSnapshot, BLOCK_HEADER_SIZE,
};

/// Page-family memory manager
pub struct MemoryManager {
    pub(super) registry: FamilyRegistry,
    pub(super) pages: HashMap<PageId, Page, RandomState>,
    pub(super) by_base: HashMap<Address, PageId, RandomState>,
    pub(super) source: Box<dyn PageSource>,
    pub(super) page_size: Size,
    pub(super) next_page_id: PageId,
    pub(super) next_base: Address,
}

impl MemoryManager {
    /// Manager backed by the process heap at the OS page size.
    pub fn new() -> Self {
        Self::with_source(Box::new(HeapPageSource::system()))
    }

    /// Manager backed by the process heap at an explicit page size.
    pub fn with_page_size(page_size: Size) -> Self {
        Self::with_source(Box::new(HeapPageSource::new(page_size)))
    }

    /// Manager drawing pages from a caller-supplied source.
    pub fn with_source(source: Box<dyn PageSource>) -> Self {
        let page_size = source.page_size();
        assert!(
            page_size > BLOCK_HEADER_SIZE,
            "page size {page_size} must exceed the block header size {BLOCK_HEADER_SIZE}"
        );
        info!(
            "memory manager initialized: page size {}, usable capacity {}",
            page_size,
            page_size - BLOCK_HEADER_SIZE
        );
        Self {
            registry: FamilyRegistry::new(),
            pages: HashMap::default(),
            by_base: HashMap::default(),
            source,
            page_size,
            // Base addresses start one page in so address 0 is never valid.
            next_page_id: 0,
            next_base: page_size,
        }
    }

    /// Size in bytes of the pages this manager works with.
    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Largest usable request a single block can hold.
    pub fn usable_capacity(&self) -> Size {
        self.page_size - BLOCK_HEADER_SIZE
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

// Implement trait interfaces
impl Allocator for MemoryManager {
    fn register_family(&mut self, name: &str, unit_size: Size) -> AllocResult<()> {
        MemoryManager::register_family(self, name, unit_size)
    }

    fn allocate(&mut self, family: &str, units: Units) -> AllocResult<Address> {
        MemoryManager::allocate(self, family, units)
    }

    fn release(&mut self, address: Address) -> AllocResult<()> {
        MemoryManager::release(self, address)
    }
}

impl MemoryInfo for MemoryManager {
    fn families(&self) -> Vec<FamilyInfo> {
        MemoryManager::families(self)
    }

    fn family_usage(&self, name: &str) -> AllocResult<FamilyUsage> {
        MemoryManager::family_usage(self, name)
    }

    fn family_pages(&self, name: &str) -> AllocResult<Vec<PageSnapshot>> {
        MemoryManager::family_pages(self, name)
    }
}
