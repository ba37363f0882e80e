/*!
 * Introspection
 * Family, page, and block visibility plus structural self-checks
 */

use super::MemoryManager;
use crate::memory::free_list::BlockRef;
use crate::memory::page::Page;
use crate::memory::registry::PageFamily;
use crate::memory::types::{
    AllocError, AllocResult, FamilyInfo, FamilyUsage, PageSnapshot, BLOCK_HEADER_SIZE,
};

impl MemoryManager {
    /// All registered families, sorted by name.
    pub fn families(&self) -> Vec<FamilyInfo> {
        let mut families: Vec<FamilyInfo> = self
            .registry
            .iter()
            .map(|family| FamilyInfo {
                name: family.name().to_owned(),
                unit_size: family.unit_size(),
                page_count: family.page_count(),
            })
            .collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        families
    }

    /// Number of pages a family currently owns.
    pub fn page_count(&self, name: &str) -> AllocResult<usize> {
        self.registry
            .lookup(name)
            .map(PageFamily::page_count)
            .ok_or_else(|| AllocError::UnknownFamily(name.to_owned()))
    }

    /// Aggregate usage counters for one family.
    pub fn family_usage(&self, name: &str) -> AllocResult<FamilyUsage> {
        let family = self
            .registry
            .lookup(name)
            .ok_or_else(|| AllocError::UnknownFamily(name.to_owned()))?;

        let mut usage = FamilyUsage {
            name: family.name().to_owned(),
            page_count: family.page_count(),
            total_blocks: 0,
            free_blocks: 0,
            occupied_blocks: 0,
            bytes_in_use: 0,
        };
        for page in self.family_page_iter(family) {
            for (_, block) in page.blocks() {
                usage.total_blocks += 1;
                if block.state.is_free() {
                    usage.free_blocks += 1;
                } else {
                    usage.occupied_blocks += 1;
                    usage.bytes_in_use += BLOCK_HEADER_SIZE + block.size;
                }
            }
        }
        Ok(usage)
    }

    /// Address-ordered block layout of every page of one family.
    pub fn family_pages(&self, name: &str) -> AllocResult<Vec<PageSnapshot>> {
        let family = self
            .registry
            .lookup(name)
            .ok_or_else(|| AllocError::UnknownFamily(name.to_owned()))?;
        Ok(self.family_page_iter(family).map(Page::snapshot).collect())
    }

    /// Verify the family's structural invariants.
    ///
    /// Checks, for every page of the family: the chain starts at offset 0
    /// with consistent back-links and strictly increasing offsets; a gap
    /// before the next block (or the page end) appears only behind an
    /// allocated block, where it is recoverable hard slack; every byte of
    /// the page is accounted for by headers, usable sizes, and those gaps;
    /// and a block is indexed if and only if it is free. Returns
    /// [`AllocError::Corrupted`] describing the first violation found.
    pub fn audit(&self, name: &str) -> AllocResult<()> {
        let family = self
            .registry
            .lookup(name)
            .ok_or_else(|| AllocError::UnknownFamily(name.to_owned()))?;

        let mut free_blocks = 0;
        for page in self.family_page_iter(family) {
            let base = page.base();
            let mut accounted = 0;
            let mut expected_prev = None;
            let mut prev_end = 0;
            let mut prev_was_free = false;

            for (id, block) in page.blocks() {
                if expected_prev.is_none() && block.offset != 0 {
                    return Err(corrupted(base, "chain does not start at offset 0"));
                }
                if block.prev != expected_prev {
                    return Err(corrupted(base, "chain back-link mismatch"));
                }
                if block.offset < prev_end {
                    return Err(corrupted(base, "chain offsets overlap"));
                }
                let gap = block.offset - prev_end;
                if gap > 0 && prev_was_free {
                    return Err(corrupted(base, "gap behind a free block"));
                }

                let reference = BlockRef {
                    page: page.id(),
                    block: id,
                };
                if block.state.is_free() {
                    free_blocks += 1;
                    if !family.free.contains(block.size, reference) {
                        return Err(corrupted(base, "free block missing from the index"));
                    }
                } else if family.free.contains_ref(reference) {
                    return Err(corrupted(base, "allocated block present in the index"));
                }

                accounted += gap + BLOCK_HEADER_SIZE + block.size;
                prev_end = block.offset + BLOCK_HEADER_SIZE + block.size;
                prev_was_free = block.state.is_free();
                expected_prev = Some(id);
            }

            if prev_end > page.page_size() {
                return Err(corrupted(base, "chain runs past the page end"));
            }
            let tail_gap = page.page_size() - prev_end;
            if tail_gap > 0 && prev_was_free {
                return Err(corrupted(base, "trailing gap behind a free block"));
            }
            accounted += tail_gap;
            if accounted != page.page_size() {
                return Err(corrupted(base, "page bytes unaccounted for"));
            }
        }

        if family.free.len() != free_blocks {
            return Err(AllocError::Corrupted(format!(
                "family {:?} has {} free blocks but {} index entries",
                name,
                free_blocks,
                family.free.len()
            )));
        }
        Ok(())
    }

    fn family_page_iter<'a>(&'a self, family: &'a PageFamily) -> impl Iterator<Item = &'a Page> {
        family.pages.iter().filter_map(|id| self.pages.get(id))
    }
}

fn corrupted(base: usize, what: &str) -> AllocError {
    AllocError::Corrupted(format!("page at {base:#x}: {what}"))
}
