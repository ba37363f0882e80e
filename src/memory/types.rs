/*!
 * Memory Types
 * Errors, layout constants, and introspection types for the allocator
 */

use crate::core::types::{Address, Offset, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// In-page footprint reserved for every block's bookkeeping, in bytes.
///
/// Block metadata itself lives out-of-band (see `page.rs`), but the layout
/// arithmetic still charges each block the footprint a packed in-page header
/// would occupy on a 64-bit target: state, size, and offset words plus two
/// chain links and a free-index link. A page's usable capacity is therefore
/// `page_size - BLOCK_HEADER_SIZE`, and a block's data region begins
/// `BLOCK_HEADER_SIZE` bytes past its offset.
pub const BLOCK_HEADER_SIZE: Size = 40;

/// Longest accepted page-family name, in bytes.
pub const MAX_FAMILY_NAME_LEN: usize = 32;

/// Memory operation result
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("family name {name:?} exceeds {max} bytes")]
    FamilyNameTooLong { name: String, max: usize },

    #[error("unit size {unit_size} for family {name:?} exceeds page capacity {capacity}")]
    UnitSizeTooLarge {
        name: String,
        unit_size: Size,
        capacity: Size,
    },

    #[error("family {0:?} is already registered")]
    DuplicateFamily(String),

    #[error("family {0:?} is not registered")]
    UnknownFamily(String),

    #[error("requested {requested} bytes exceeds page capacity {capacity}")]
    RequestTooLarge { requested: Size, capacity: Size },

    #[error("page source could not supply a page")]
    PageSourceExhausted,

    #[error("double release of address {0:#x}")]
    DoubleRelease(Address),

    #[error("address {0:#x} does not belong to any allocation")]
    UnknownAddress(Address),

    #[error("range of {len} bytes at {address:#x} escapes its block")]
    RangeOutOfBounds { address: Address, len: Size },

    #[error("allocator state corrupted: {0}")]
    Corrupted(String),
}

impl AllocError {
    /// Whether this error is an unrecoverable usage violation.
    ///
    /// Recoverable conditions (unknown family, capacity, exhaustion) can be
    /// handled and retried. Usage violations mean the caller has broken the
    /// allocation protocol or the structure is corrupted; continuing with
    /// normal operation is unsound and the caller should propagate or abort.
    pub fn is_usage_violation(&self) -> bool {
        matches!(
            self,
            AllocError::DuplicateFamily(_)
                | AllocError::DoubleRelease(_)
                | AllocError::UnknownAddress(_)
                | AllocError::Corrupted(_)
        )
    }
}

/// Block state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    Free,
    Allocated,
}

impl BlockState {
    pub fn is_free(self) -> bool {
        matches!(self, BlockState::Free)
    }
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BlockState::Free => write!(f, "FREE"),
            BlockState::Allocated => write!(f, "ALLOCATED"),
        }
    }
}

/// One block of a page, as seen through introspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub offset: Offset,
    pub size: Size,
    pub state: BlockState,
}

/// Address-ordered view of one page and its blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub base: Address,
    pub blocks: Vec<BlockInfo>,
}

/// Registered family summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyInfo {
    pub name: String,
    pub unit_size: Size,
    pub page_count: usize,
}

/// Aggregate usage counters for one family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyUsage {
    pub name: String,
    pub page_count: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub occupied_blocks: usize,
    /// Bytes consumed by occupied blocks, header footprint included.
    pub bytes_in_use: Size,
}
