//! # memcall
//!
//! Page-granular memory regions obtained directly from the operating system.
//!
//! A [`Region`] is mapped with `mmap` (or `VirtualAlloc` on Windows), so its
//! address never changes for as long as it is mapped. Regions can be locked
//! into RAM to keep them out of swap, and they are always wiped before the
//! pages are handed back to the kernel.

mod error;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

use log::{trace, warn};
use std::fmt;
use std::ptr::NonNull;
use zeroize::Zeroize;

pub use error::MemcallError;

/// Returns the system's page size.
pub fn page_size() -> usize {
    platform::page_size()
}

/// Rounds `size` up to a whole number of pages.
///
/// Returns `None` when the rounded size would overflow `usize`.
pub fn round_to_pages(size: usize) -> Option<usize> {
    let page = page_size();
    size.checked_add(page - 1).map(|s| s / page * page)
}

/// An anonymous, read-write mapping of whole pages.
///
/// The mapping is zeroed when created and wiped again before it is unmapped.
/// Dropping a region unmaps it; [`Region::unmap`] does the same but reports
/// failures to the caller.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
    locked: bool,
    mapped: bool,
}

// SAFETY: the region exclusively owns its mapping.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Maps at least `size` bytes. The region length is rounded up to the page size.
    pub fn map(size: usize) -> Result<Self, MemcallError> {
        if size == 0 {
            return Err(MemcallError::InvalidArgument(
                "<memcall> cannot map an empty region".to_string(),
            ));
        }

        let len = round_to_pages(size).ok_or_else(|| {
            MemcallError::InvalidArgument(format!("<memcall> size {} overflows page rounding", size))
        })?;

        let ptr = platform::alloc(len)?;
        trace!("<memcall> mapped {} bytes at {:p}", len, ptr.as_ptr());

        let mut region = Self {
            ptr,
            len,
            locked: false,
            mapped: true,
        };
        region.as_bytes_mut().zeroize();

        Ok(region)
    }

    /// Total number of mapped bytes (a multiple of the page size).
    pub fn len(&self) -> usize {
        self.len
    }

    /// A region always covers at least one page.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Start of the mapping. Stable for the region's whole lifetime.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes while the region is mapped.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for len bytes and uniquely borrowed through &mut self.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Whether the region is currently locked into RAM.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks the region into physical memory and excludes it from core dumps
    /// where the platform supports it.
    pub fn lock(&mut self) -> Result<(), MemcallError> {
        if self.locked {
            return Ok(());
        }
        platform::lock(self.ptr, self.len)?;
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<(), MemcallError> {
        if !self.locked {
            return Ok(());
        }
        platform::unlock(self.ptr, self.len)?;
        self.locked = false;
        Ok(())
    }

    /// Zeroes every byte of the mapping.
    pub fn wipe(&mut self) {
        self.as_bytes_mut().zeroize();
    }

    /// Wipes, unlocks and unmaps the region.
    pub fn unmap(mut self) -> Result<(), MemcallError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), MemcallError> {
        if !self.mapped {
            return Ok(());
        }
        self.wipe();
        let unlocked = self.unlock();
        platform::free(self.ptr, self.len)?;
        self.mapped = false;
        trace!("<memcall> unmapped {} bytes at {:p}", self.len, self.ptr.as_ptr());
        unlocked
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("<memcall> failed to release region: {}", e);
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("locked", &self.locked)
            .finish()
    }
}

/// Disables creation of core dump files for the current process.
pub fn disable_core_dumps() -> Result<(), MemcallError> {
    platform::disable_core_dumps()
}
