/*!
 * Block Engine
 * Layout of a single page: block chain, splitting, and coalescing
 */

use crate::core::types::{Address, Offset, Size};
use log::trace;

use super::free_list::{BlockRef, FreeIndex};
use super::source::PageMemory;
use super::types::{AllocError, AllocResult, BlockInfo, BlockState, PageSnapshot, BLOCK_HEADER_SIZE};

/// Identifier of a page within the manager's page table.
pub(crate) type PageId = u64;

/// Slot index of a block within its page's arena.
pub(crate) type BlockId = usize;

/// One block of a page.
///
/// Blocks form an address-ordered doubly-linked chain threaded through
/// `prev`/`next` slot indices. `size` is the usable byte count, excluding the
/// header footprint; the data region spans
/// `[offset + BLOCK_HEADER_SIZE, offset + BLOCK_HEADER_SIZE + size)`.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub state: BlockState,
    pub size: Size,
    pub offset: Offset,
    pub prev: Option<BlockId>,
    pub next: Option<BlockId>,
}

/// One page and the blocks carved out of it.
///
/// The chain always begins at offset 0 and accounts for every byte of the
/// page: each block charges `BLOCK_HEADER_SIZE + size`, and any gap between a
/// block's nominal end and its successor (or the page end) is hard
/// fragmentation slack, recoverable from the recorded offsets when the block
/// is released. Blocks live in a slot arena so chain splices never move
/// memory and never invalidate other blocks' identifiers.
#[derive(Debug)]
pub(crate) struct Page {
    id: PageId,
    base: Address,
    family: String,
    data: PageMemory,
    slots: Vec<Option<Block>>,
    free_slots: Vec<BlockId>,
    first: BlockId,
}

impl Page {
    /// Wrap freshly acquired page memory as a single free block spanning the
    /// page's entire usable capacity.
    pub fn new(id: PageId, base: Address, family: String, data: PageMemory) -> Self {
        let capacity = data.len() - BLOCK_HEADER_SIZE;
        Self {
            id,
            base,
            family,
            data,
            slots: vec![Some(Block {
                state: BlockState::Free,
                size: capacity,
                offset: 0,
                prev: None,
                next: None,
            })],
            free_slots: Vec::new(),
            first: 0,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn family_name(&self) -> &str {
        &self.family
    }

    pub fn page_size(&self) -> Size {
        self.data.len()
    }

    pub fn usable_capacity(&self) -> Size {
        self.data.len() - BLOCK_HEADER_SIZE
    }

    pub fn first_block(&self) -> BlockId {
        self.first
    }

    pub fn into_memory(self) -> PageMemory {
        self.data
    }

    pub fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    fn block(&self, id: BlockId) -> &Block {
        match &self.slots[id] {
            Some(block) => block,
            None => unreachable!("vacant block slot {id}"),
        }
    }

    fn block_mut(&mut self, id: BlockId) -> &mut Block {
        match &mut self.slots[id] {
            Some(block) => block,
            None => unreachable!("vacant block slot {id}"),
        }
    }

    fn alloc_slot(&mut self, block: Block) -> BlockId {
        if let Some(id) = self.free_slots.pop() {
            self.slots[id] = Some(block);
            id
        } else {
            self.slots.push(Some(block));
            self.slots.len() - 1
        }
    }

    fn free_slot(&mut self, id: BlockId) {
        self.slots[id] = None;
        self.free_slots.push(id);
    }

    fn block_ref(&self, id: BlockId) -> BlockRef {
        BlockRef {
            page: self.id,
            block: id,
        }
    }

    pub fn block_state(&self, id: BlockId) -> BlockState {
        self.block(id).state
    }

    pub fn block_size(&self, id: BlockId) -> Size {
        self.block(id).size
    }

    pub fn block_offset(&self, id: BlockId) -> Offset {
        self.block(id).offset
    }

    /// Iterate the chain in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            page: self,
            current: Some(self.first),
        }
    }

    /// The block whose data region starts exactly at `offset`, if any.
    pub fn find_data_start(&self, offset: Offset) -> Option<BlockId> {
        self.blocks()
            .find(|&(_, block)| block.offset + BLOCK_HEADER_SIZE == offset)
            .map(|(id, _)| id)
    }

    /// The allocated block whose data region contains `offset`, if any.
    pub fn find_containing(&self, offset: Offset) -> Option<BlockId> {
        self.blocks()
            .find(|&(_, block)| {
                let start = block.offset + BLOCK_HEADER_SIZE;
                !block.state.is_free() && offset >= start && offset < start + block.size
            })
            .map(|(id, _)| id)
    }

    /// Whether the page has collapsed back to a single free block.
    pub fn is_empty(&self) -> bool {
        let head = self.block(self.first);
        head.state.is_free() && head.prev.is_none() && head.next.is_none()
    }

    /// Consume a free block to satisfy `requested` usable bytes.
    ///
    /// The block leaves the free index and becomes allocated with usable size
    /// `requested`. What happens to the remainder depends on its size:
    /// nothing for an exact fit; absorption as invisible hard slack when it
    /// cannot host a header; otherwise a new free block (possibly zero-sized)
    /// is carved at the remainder's offset, chained after this block, and
    /// indexed.
    pub fn split(
        &mut self,
        id: BlockId,
        requested: Size,
        free: &mut FreeIndex,
    ) -> AllocResult<()> {
        let (old_size, offset, old_next) = {
            let block = self.block(id);
            debug_assert!(block.state.is_free(), "split target must be free");
            (block.size, block.offset, block.next)
        };
        if requested > old_size {
            return Err(AllocError::RequestTooLarge {
                requested,
                capacity: old_size,
            });
        }

        free.remove(old_size, self.block_ref(id));
        {
            let block = self.block_mut(id);
            block.state = BlockState::Allocated;
            block.size = requested;
        }
        let remaining = old_size - requested;

        if remaining >= BLOCK_HEADER_SIZE {
            let carved = self.alloc_slot(Block {
                state: BlockState::Free,
                size: remaining - BLOCK_HEADER_SIZE,
                offset: offset + BLOCK_HEADER_SIZE + requested,
                prev: Some(id),
                next: old_next,
            });
            self.block_mut(id).next = Some(carved);
            if let Some(next) = old_next {
                self.block_mut(next).prev = Some(carved);
            }
            free.insert(remaining - BLOCK_HEADER_SIZE, self.block_ref(carved));
            trace!(
                "split block @{offset}: {requested} taken, free remainder of {} carved",
                remaining - BLOCK_HEADER_SIZE
            );
        } else if remaining > 0 {
            // Remainder too small to host a header: absorbed as hard slack,
            // invisible until release-time reclamation recovers it.
            trace!("split block @{offset}: {requested} taken, {remaining} bytes of hard slack");
        }

        Ok(())
    }

    /// Return an allocated block to the free state, reclaiming slack and
    /// coalescing with free neighbors.
    ///
    /// Slack reclamation first: the gap between the block's nominal end and
    /// the true start of its successor (or the page end) is folded back into
    /// its usable size. Then a free successor is absorbed into this block,
    /// and this block is absorbed into a free predecessor; the surviving
    /// block and its final usable size are returned. The survivor is NOT
    /// reinserted into the index here: the caller first decides whether the
    /// whole page is to be reclaimed.
    pub fn release(&mut self, id: BlockId, free: &mut FreeIndex) -> (BlockId, Size) {
        let page_size = self.data.len();
        {
            let block = self.block_mut(id);
            debug_assert!(!block.state.is_free(), "release target must be allocated");
            block.state = BlockState::Free;
        }

        // Reclaim hard-fragmentation and page-boundary slack.
        let (offset, size, next) = {
            let block = self.block(id);
            (block.offset, block.size, block.next)
        };
        let end = offset + BLOCK_HEADER_SIZE + size;
        let limit = match next {
            Some(next) => self.block(next).offset,
            None => page_size,
        };
        if limit > end {
            self.block_mut(id).size += limit - end;
            trace!("reclaimed {} slack bytes behind block @{offset}", limit - end);
        }

        // Absorb a free successor.
        if let Some(next_id) = next {
            if self.block(next_id).state.is_free() {
                let (next_size, next_next) = {
                    let next_block = self.block(next_id);
                    (next_block.size, next_block.next)
                };
                free.remove(next_size, self.block_ref(next_id));
                let block = self.block_mut(id);
                block.size += BLOCK_HEADER_SIZE + next_size;
                block.next = next_next;
                if let Some(after) = next_next {
                    self.block_mut(after).prev = Some(id);
                }
                self.free_slot(next_id);
                trace!("merged block @{offset} with its successor");
            }
        }

        // Absorb into a free predecessor; the predecessor survives.
        let mut survivor = id;
        if let Some(prev_id) = self.block(id).prev {
            if self.block(prev_id).state.is_free() {
                let prev_size = self.block(prev_id).size;
                free.remove(prev_size, self.block_ref(prev_id));
                let (cur_size, cur_next) = {
                    let block = self.block(id);
                    (block.size, block.next)
                };
                let prev_block = self.block_mut(prev_id);
                prev_block.size += BLOCK_HEADER_SIZE + cur_size;
                prev_block.next = cur_next;
                if let Some(after) = cur_next {
                    self.block_mut(after).prev = Some(prev_id);
                }
                self.free_slot(id);
                survivor = prev_id;
                trace!("merged block @{offset} into its predecessor");
            }
        }

        (survivor, self.block(survivor).size)
    }

    /// Address-ordered view of the chain for diagnostics.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            base: self.base,
            blocks: self
                .blocks()
                .map(|(_, block)| BlockInfo {
                    offset: block.offset,
                    size: block.size,
                    state: block.state,
                })
                .collect(),
        }
    }
}

pub(crate) struct Blocks<'a> {
    page: &'a Page,
    current: Option<BlockId>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (BlockId, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let block = self.page.block(id);
        self.current = block.next;
        Some((id, block))
    }
}
