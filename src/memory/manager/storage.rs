/*!
 * Memory Storage Operations
 * Read/write access to the bytes behind allocated addresses
 */

use log::warn;

use super::MemoryManager;
use crate::core::types::{Address, Size};
use crate::memory::types::{AllocError, AllocResult, BLOCK_HEADER_SIZE};

impl MemoryManager {
    /// Write bytes at an address inside an allocated block.
    ///
    /// The write must stay within the block's usable region; anything else is
    /// rejected without touching the page.
    pub fn write_bytes(&mut self, address: Address, data: &[u8]) -> AllocResult<()> {
        let (page_id, base) = self.page_of(address)?;
        let page = self
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| AllocError::Corrupted("base index references a missing page".to_owned()))?;

        let offset = address - base;
        let block = match page.find_containing(offset) {
            Some(block) => block,
            None => {
                warn!("write to address {:#x} outside any allocated block", address);
                return Err(AllocError::UnknownAddress(address));
            }
        };

        let data_end = page.block_offset(block) + BLOCK_HEADER_SIZE + page.block_size(block);
        if offset + data.len() > data_end {
            warn!(
                "write of {} bytes at {:#x} escapes its block",
                data.len(),
                address
            );
            return Err(AllocError::RangeOutOfBounds {
                address,
                len: data.len(),
            });
        }

        page.bytes_mut()[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Read bytes from an address inside an allocated block.
    pub fn read_bytes(&self, address: Address, len: Size) -> AllocResult<Vec<u8>> {
        let (page_id, base) = self.page_of(address)?;
        let page = self
            .pages
            .get(&page_id)
            .ok_or_else(|| AllocError::Corrupted("base index references a missing page".to_owned()))?;

        let offset = address - base;
        let block = match page.find_containing(offset) {
            Some(block) => block,
            None => {
                warn!("read from address {:#x} outside any allocated block", address);
                return Err(AllocError::UnknownAddress(address));
            }
        };

        let data_end = page.block_offset(block) + BLOCK_HEADER_SIZE + page.block_size(block);
        if offset + len > data_end {
            warn!("read of {} bytes at {:#x} escapes its block", len, address);
            return Err(AllocError::RangeOutOfBounds { address, len });
        }

        Ok(page.bytes()[offset..offset + len].to_vec())
    }
}
