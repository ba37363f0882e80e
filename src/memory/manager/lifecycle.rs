/*!
 * Page Lifecycle
 * Acquiring pages on demand and returning empty ones to the source
 */

use log::info;

use super::MemoryManager;
use crate::core::types::Size;
use crate::memory::free_list::BlockRef;
use crate::memory::page::{Page, PageId};
use crate::memory::types::{AllocError, AllocResult};

impl MemoryManager {
    /// Make sure the family's free index can satisfy `size` usable bytes.
    ///
    /// A no-op when the index head is already big enough. Otherwise one page
    /// is acquired from the source, wrapped as a single free block spanning
    /// its usable capacity, linked at the head of the family's page list, and
    /// indexed. A source failure propagates without touching any state.
    pub(crate) fn ensure_capacity(&mut self, name: &str, size: Size) -> AllocResult<()> {
        let satisfied = match self.registry.lookup(name) {
            Some(family) => family
                .free
                .largest()
                .map_or(false, |(largest, _)| largest >= size),
            None => return Err(AllocError::UnknownFamily(name.to_owned())),
        };
        if satisfied {
            return Ok(());
        }

        let memory = self.source.acquire_page()?;
        debug_assert_eq!(memory.len(), self.page_size);

        let id = self.next_page_id;
        self.next_page_id += 1;
        let base = self.next_base;
        self.next_base += self.page_size;

        let page = Page::new(id, base, name.to_owned(), memory);
        let capacity = page.usable_capacity();
        let head = page.first_block();

        let family = self
            .registry
            .lookup_mut(name)
            .ok_or_else(|| AllocError::UnknownFamily(name.to_owned()))?;
        family.pages.insert(0, id);
        family.free.insert(capacity, BlockRef { page: id, block: head });
        self.by_base.insert(base, id);
        self.pages.insert(id, page);

        info!(
            "acquired page at {:#x} for family {:?} ({} pages now owned)",
            base,
            name,
            self.registry.lookup(name).map_or(0, |f| f.page_count())
        );
        Ok(())
    }

    /// Return the page to the source if its chain has collapsed to a single
    /// free block. Called after every release, once coalescing is done.
    pub(crate) fn reclaim_if_empty(&mut self, id: PageId) -> bool {
        let empty = self.pages.get(&id).map_or(false, |page| page.is_empty());
        if !empty {
            return false;
        }

        if let Some(page) = self.pages.remove(&id) {
            let base = page.base();
            self.by_base.remove(&base);
            if let Some(family) = self.registry.lookup_mut(page.family_name()) {
                family.pages.retain(|&p| p != id);
            }
            info!(
                "page at {:#x} is empty, returning it to the source (family {:?})",
                base,
                page.family_name()
            );
            self.source.release_page(page.into_memory());
            true
        } else {
            false
        }
    }
}
