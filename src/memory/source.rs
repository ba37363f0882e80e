/*!
 * Page Source
 * Default supplier of zero-filled pages backed by the process heap
 */

use super::traits::PageSource;
use super::types::{AllocError, AllocResult};
use crate::core::types::Size;
use log::{debug, error};

/// Fallback page size when the OS cannot be asked.
pub const DEFAULT_PAGE_SIZE: Size = 4096;

/// One page worth of owned, zero-filled memory.
///
/// Pages are real byte buffers: the addresses the manager hands out are
/// positions inside these buffers, reachable through the manager's
/// `read_bytes`/`write_bytes` operations.
#[derive(Debug)]
pub struct PageMemory {
    bytes: Box<[u8]>,
}

impl PageMemory {
    pub fn zeroed(len: Size) -> Self {
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> Size {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Page source that carves pages out of the process heap.
///
/// An optional page budget makes the source finite, which is how resource
/// exhaustion is exercised without actually draining the machine.
#[derive(Debug)]
pub struct HeapPageSource {
    page_size: Size,
    max_pages: Option<usize>,
    outstanding: usize,
}

impl HeapPageSource {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            max_pages: None,
            outstanding: 0,
        }
    }

    /// Source using the operating system's page size.
    pub fn system() -> Self {
        Self::new(system_page_size())
    }

    /// Source that refuses to supply more than `max_pages` pages at once.
    pub fn with_page_limit(page_size: Size, max_pages: usize) -> Self {
        Self {
            page_size,
            max_pages: Some(max_pages),
            outstanding: 0,
        }
    }
}

impl PageSource for HeapPageSource {
    fn page_size(&self) -> Size {
        self.page_size
    }

    fn acquire_page(&mut self) -> AllocResult<PageMemory> {
        if let Some(max) = self.max_pages {
            if self.outstanding >= max {
                error!(
                    "page source exhausted: {} of {} pages outstanding",
                    self.outstanding, max
                );
                return Err(AllocError::PageSourceExhausted);
            }
        }
        self.outstanding += 1;
        debug!(
            "supplying one {}-byte page ({} outstanding)",
            self.page_size, self.outstanding
        );
        Ok(PageMemory::zeroed(self.page_size))
    }

    fn release_page(&mut self, page: PageMemory) {
        self.outstanding = self.outstanding.saturating_sub(1);
        debug!(
            "took back one {}-byte page ({} outstanding)",
            page.len(),
            self.outstanding
        );
        drop(page);
    }
}

/// Ask the OS for its page size.
#[cfg(unix)]
pub fn system_page_size() -> Size {
    let size = unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) };
    if size > 0 {
        size as Size
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[cfg(not(unix))]
pub fn system_page_size() -> Size {
    DEFAULT_PAGE_SIZE
}
