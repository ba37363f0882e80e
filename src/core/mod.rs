/*!
 * Core Module
 * Fundamental types shared by every allocator component
 */

pub mod types;

// Re-export for convenience
pub use types::*;
