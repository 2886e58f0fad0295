use crate::error::MemcallError;
use log::warn;
use once_cell::sync::Lazy;
use std::io;
use std::ptr::{self, NonNull};
use winapi::um::memoryapi::{VirtualAlloc, VirtualFree, VirtualLock, VirtualUnlock};
use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
use winapi::um::winnt::{MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    // SAFETY: GetSystemInfo fills a zeroed, caller-owned struct.
    unsafe {
        let mut info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut info);
        info.dwPageSize as usize
    }
});

pub(crate) fn page_size() -> usize {
    *PAGE_SIZE
}

pub(crate) fn alloc(len: usize) -> Result<NonNull<u8>, MemcallError> {
    // SAFETY: a fresh reservation, no existing memory involved.
    let ptr = unsafe { VirtualAlloc(ptr::null_mut(), len, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| {
        MemcallError::SystemError(format!(
            "<memcall> could not allocate [Err: {}]",
            io::Error::last_os_error()
        ))
    })
}

pub(crate) fn free(ptr: NonNull<u8>, _len: usize) -> Result<(), MemcallError> {
    // SAFETY: ptr was returned by VirtualAlloc.
    let result = unsafe { VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) };
    if result == 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not deallocate {:p} [Err: {}]",
            ptr.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

pub(crate) fn lock(ptr: NonNull<u8>, len: usize) -> Result<(), MemcallError> {
    // SAFETY: ptr/len describe a live allocation.
    let result = unsafe { VirtualLock(ptr.as_ptr().cast(), len) };
    if result == 0 {
        return Err(MemcallError::ResourceLimit(format!(
            "<memcall> could not acquire lock on {:p}, limit reached? [Err: {}]",
            ptr.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

pub(crate) fn unlock(ptr: NonNull<u8>, len: usize) -> Result<(), MemcallError> {
    // SAFETY: ptr/len describe a live allocation.
    let result = unsafe { VirtualUnlock(ptr.as_ptr().cast(), len) };
    if result == 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not free lock on {:p} [Err: {}]",
            ptr.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// Windows Error Reporting dumps are governed by system-wide settings that
/// this crate does not change, so this only records that nothing was done.
pub(crate) fn disable_core_dumps() -> Result<(), MemcallError> {
    warn!("<memcall> disabling core dumps is a no-op on Windows; configure WER to suppress crash dumps");
    Ok(())
}
