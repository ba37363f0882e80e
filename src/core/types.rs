/*!
 * Core Types
 * Common scalar types used across the allocator
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Byte offset from the start of a page
pub type Offset = usize;

/// Allocation request length expressed in family units
pub type Units = usize;
