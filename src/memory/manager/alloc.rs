/*!
 * Allocation API
 * Family registration, allocate, and release entry points
 */

use log::{error, info, warn};

use super::MemoryManager;
use crate::core::types::{Address, Size, Units};
use crate::memory::free_list::BlockRef;
use crate::memory::page::PageId;
use crate::memory::registry::PageFamily;
use crate::memory::types::{AllocError, AllocResult, BLOCK_HEADER_SIZE};

impl MemoryManager {
    /// Register a named family with a fixed allocation unit size.
    pub fn register_family(&mut self, name: &str, unit_size: Size) -> AllocResult<()> {
        let capacity = self.usable_capacity();
        self.registry.register(name, unit_size, capacity)
    }

    /// Read-only family lookup for diagnostics.
    pub fn find_family(&self, name: &str) -> Option<&PageFamily> {
        self.registry.lookup(name)
    }

    /// Allocate `units` units for a family and zero-fill the region.
    ///
    /// The request is served from the head of the family's free index; a new
    /// page is acquired first if the head is too small. Returns the address
    /// of the first usable byte, just past the block's header footprint.
    pub fn allocate(&mut self, name: &str, units: Units) -> AllocResult<Address> {
        let unit_size = match self.registry.lookup(name) {
            Some(family) => family.unit_size(),
            None => {
                warn!("allocation for unregistered family {:?}", name);
                return Err(AllocError::UnknownFamily(name.to_owned()));
            }
        };

        let requested = units.checked_mul(unit_size).unwrap_or(Size::MAX);
        let capacity = self.usable_capacity();
        if requested > capacity {
            error!(
                "request of {} x {} bytes for family {:?} exceeds page capacity {}",
                units, unit_size, name, capacity
            );
            return Err(AllocError::RequestTooLarge {
                requested,
                capacity,
            });
        }

        self.ensure_capacity(name, requested)?;

        let head = self
            .registry
            .lookup(name)
            .and_then(|family| family.free.largest());
        let (head_size, head) = match head {
            Some(found) => found,
            None => return Err(AllocError::PageSourceExhausted),
        };
        debug_assert!(head_size >= requested);

        let family = self
            .registry
            .lookup_mut(name)
            .ok_or_else(|| AllocError::Corrupted(format!("family {name:?} vanished")))?;
        let page = self.pages.get_mut(&head.page).ok_or_else(|| {
            AllocError::Corrupted("free index references a missing page".to_owned())
        })?;

        page.split(head.block, requested, &mut family.free)?;

        let data_start = page.block_offset(head.block) + BLOCK_HEADER_SIZE;
        page.bytes_mut()[data_start..data_start + requested].fill(0);
        let address = page.base() + data_start;

        info!(
            "allocated {} bytes ({} x {}) for family {:?} at {:#x}",
            requested, units, unit_size, name, address
        );
        Ok(address)
    }

    /// Release an address obtained from [`allocate`](Self::allocate).
    ///
    /// The owning block is recovered from the address, merged with any free
    /// neighbors, and reindexed — or, if the page has emptied, the whole page
    /// goes back to the source. Releasing an address twice, or one the
    /// manager never produced, is a usage violation reported without any
    /// state change.
    pub fn release(&mut self, address: Address) -> AllocResult<()> {
        let (page_id, base) = self.page_of(address)?;

        let family_name = self
            .pages
            .get(&page_id)
            .map(|page| page.family_name().to_owned())
            .ok_or_else(|| AllocError::Corrupted("base index references a missing page".to_owned()))?;
        let family = self
            .registry
            .lookup_mut(&family_name)
            .ok_or_else(|| AllocError::Corrupted(format!("family {family_name:?} vanished")))?;
        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| AllocError::Corrupted("base index references a missing page".to_owned()))?;

        let block = match page.find_data_start(address - base) {
            Some(block) => block,
            None => {
                warn!("release of address {:#x} that no block starts at", address);
                return Err(AllocError::UnknownAddress(address));
            }
        };
        if page.block_state(block).is_free() {
            warn!("double release of address {:#x}", address);
            return Err(AllocError::DoubleRelease(address));
        }

        let (survivor, survivor_size) = page.release(block, &mut family.free);
        info!(
            "released block at {:#x} (family {:?}), {} usable bytes free after coalescing",
            address, family_name, survivor_size
        );

        if !self.reclaim_if_empty(page_id) {
            let family = self
                .registry
                .lookup_mut(&family_name)
                .ok_or_else(|| AllocError::Corrupted(format!("family {family_name:?} vanished")))?;
            family.free.insert(
                survivor_size,
                BlockRef {
                    page: page_id,
                    block: survivor,
                },
            );
        }
        Ok(())
    }

    /// Resolve an address to its owning page via the page-aligned base.
    pub(super) fn page_of(&self, address: Address) -> AllocResult<(PageId, Address)> {
        let base = address - (address % self.page_size);
        match self.by_base.get(&base) {
            Some(&id) => Ok((id, base)),
            None => {
                warn!("address {:#x} does not fall inside any page", address);
                Err(AllocError::UnknownAddress(address))
            }
        }
    }
}
