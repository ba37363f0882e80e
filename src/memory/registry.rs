/*!
 * Page-Family Registry
 * Maps type names to their allocation unit size and owned pages
 */

use ahash::RandomState;
use log::{error, info};
use std::collections::HashMap;

use crate::core::types::Size;

use super::free_list::FreeIndex;
use super::page::PageId;
use super::types::{AllocError, AllocResult, MAX_FAMILY_NAME_LEN};

/// One registered allocation class.
///
/// A family's identity (name and unit size) is fixed at registration and
/// never changes. The family owns its page list — index 0 is the most
/// recently acquired page — and the free index over those pages' blocks.
#[derive(Debug)]
pub struct PageFamily {
    pub(crate) name: String,
    pub(crate) unit_size: Size,
    pub(crate) pages: Vec<PageId>,
    pub(crate) free: FreeIndex,
}

impl PageFamily {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_size(&self) -> Size {
        self.unit_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Name-keyed table of page families; the top-level namespace of the
/// allocator.
#[derive(Debug, Default)]
pub(crate) struct FamilyRegistry {
    families: HashMap<String, PageFamily, RandomState>,
}

impl FamilyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new family. `capacity` is the page usable capacity the
    /// unit size is validated against.
    pub fn register(&mut self, name: &str, unit_size: Size, capacity: Size) -> AllocResult<()> {
        if name.len() > MAX_FAMILY_NAME_LEN {
            error!(
                "rejecting family name of {} bytes (limit {})",
                name.len(),
                MAX_FAMILY_NAME_LEN
            );
            return Err(AllocError::FamilyNameTooLong {
                name: name.to_owned(),
                max: MAX_FAMILY_NAME_LEN,
            });
        }
        if unit_size > capacity {
            error!(
                "unit size {} for family {:?} exceeds page capacity {}",
                unit_size, name, capacity
            );
            return Err(AllocError::UnitSizeTooLarge {
                name: name.to_owned(),
                unit_size,
                capacity,
            });
        }
        if self.families.contains_key(name) {
            error!("family {:?} is already registered", name);
            return Err(AllocError::DuplicateFamily(name.to_owned()));
        }

        self.families.insert(
            name.to_owned(),
            PageFamily {
                name: name.to_owned(),
                unit_size,
                pages: Vec::new(),
                free: FreeIndex::new(),
            },
        );
        info!("registered family {:?} with unit size {}", name, unit_size);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&PageFamily> {
        self.families.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut PageFamily> {
        self.families.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageFamily> {
        self.families.values()
    }
}
