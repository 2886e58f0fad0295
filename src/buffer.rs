//! Address-stable, zero-on-release storage.

use crate::error::{Result, SecretError};
use crate::policy::memory_policy;
use log::{trace, warn};
use memcall::Region;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for char {}
}

/// Element types a [`SecureBuffer`] may hold.
///
/// # Safety
///
/// Implementors must be plain `Copy` data without drop glue, and the all-zero
/// bit pattern must be a valid value, because buffers are read straight from
/// freshly mapped (zeroed) pages and wiped back to zero on release.
pub unsafe trait SecureElement: sealed::Sealed + Copy + 'static {}

// SAFETY: every bit pattern is a valid u8.
unsafe impl SecureElement for u8 {}
// SAFETY: zero is U+0000, a valid scalar value. Writes only ever store valid chars.
unsafe impl SecureElement for char {}

/// Observes whether a buffer has been released, without keeping it alive.
#[derive(Clone, Debug)]
pub struct ReleaseProbe(Arc<AtomicBool>);

impl ReleaseProbe {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// True once the observed buffer has been wiped and unmapped.
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_released(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A fixed-capacity region of `T` whose address never changes while it is live.
///
/// Storage comes from a dedicated page mapping, optionally locked into RAM.
/// Releasing the buffer (explicitly through [`dispose`](Self::dispose) or on
/// drop) zeroes the entire mapping, including the page slack beyond the
/// capacity, before the pages are returned.
///
/// Views never extend past the logical length, which starts out equal to the
/// capacity and can be narrowed.
pub struct SecureBuffer<T: SecureElement> {
    region: Option<Region>,
    capacity: usize,
    len: usize,
    released: bool,
    probe: Option<ReleaseProbe>,
    _marker: PhantomData<T>,
}

impl<T: SecureElement> SecureBuffer<T> {
    /// Allocates a zeroed buffer for exactly `capacity` elements.
    pub fn new(capacity: usize) -> Result<Self> {
        let region = if capacity == 0 {
            None
        } else {
            let bytes = capacity.checked_mul(mem::size_of::<T>()).ok_or_else(|| {
                SecretError::Range(format!("{} elements exceed the addressable size", capacity))
            })?;
            Some(Self::map_region(bytes)?)
        };

        trace!(
            "allocated secure buffer: {} x {} bytes",
            capacity,
            mem::size_of::<T>()
        );

        Ok(Self {
            region,
            capacity,
            len: capacity,
            released: false,
            probe: None,
            _marker: PhantomData,
        })
    }

    /// Allocates a buffer sized to `data` and copies it in.
    ///
    /// The source slice is left untouched.
    pub fn from_slice(data: &[T]) -> Result<Self> {
        let mut buffer = Self::new(data.len())?;
        buffer.as_mut_slice()?.copy_from_slice(data);
        Ok(buffer)
    }

    fn map_region(bytes: usize) -> Result<Region> {
        let mut region = Region::map(bytes)?;
        let policy = memory_policy();
        if policy.lock_memory {
            if let Err(e) = region.lock() {
                if policy.require_lock {
                    return Err(e.into());
                }
                warn!("secure buffer left unlocked: {}", e);
            }
        }
        Ok(region)
    }

    /// Number of elements visible through the buffer's views.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the buffer was allocated for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(SecretError::Released("secure buffer"));
        }
        Ok(())
    }

    /// Read view over the logical length.
    pub fn as_slice(&self) -> Result<&[T]> {
        self.ensure_live()?;
        Ok(match &self.region {
            // SAFETY: the mapping is page aligned, holds at least `capacity`
            // elements, and `len <= capacity`. Zeroed pages are valid `T`.
            Some(region) => unsafe {
                std::slice::from_raw_parts(region.as_ptr().cast::<T>().cast_const(), self.len)
            },
            None => &[],
        })
    }

    /// Mutable view over the logical length.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T]> {
        self.ensure_live()?;
        let len = self.len;
        Ok(match &mut self.region {
            // SAFETY: as in `as_slice`; uniqueness follows from `&mut self`.
            Some(region) => unsafe { std::slice::from_raw_parts_mut(region.as_ptr().cast::<T>(), len) },
            None => &mut [],
        })
    }

    /// Narrows the visible length to `len`.
    ///
    /// Fails with a range error if `len` exceeds the physical capacity.
    pub fn set_logical_len(&mut self, len: usize) -> Result<()> {
        self.ensure_live()?;
        if len > self.capacity {
            return Err(SecretError::Range(format!(
                "logical length {} exceeds capacity {}",
                len, self.capacity
            )));
        }
        self.len = len;
        Ok(())
    }

    /// Returns a probe that reports when this buffer is released.
    pub fn probe(&mut self) -> ReleaseProbe {
        let probe = self.probe.get_or_insert_with(ReleaseProbe::new).clone();
        if self.released {
            probe.mark_released();
        }
        probe
    }

    /// Zeroes every byte of the mapping, not only the logical length.
    fn scrub(&mut self) {
        if let Some(region) = self.region.as_mut() {
            region.wipe();
        }
    }

    /// Wipes and releases the storage. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.released {
            return;
        }
        self.scrub();
        if let Some(region) = self.region.take() {
            if let Err(e) = region.unmap() {
                warn!("failed to unmap secure buffer: {}", e);
            }
        }
        self.released = true;
        self.len = 0;
        if let Some(probe) = &self.probe {
            probe.mark_released();
        }
        trace!("released secure buffer of {} elements", self.capacity);
    }
}

impl<T: SecureElement> Drop for SecureBuffer<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: SecureElement> fmt::Debug for SecureBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
