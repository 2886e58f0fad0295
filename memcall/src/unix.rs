use crate::error::MemcallError;
use once_cell::sync::Lazy;
use std::io;
use std::ptr::{self, NonNull};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
});

pub(crate) fn page_size() -> usize {
    *PAGE_SIZE
}

pub(crate) fn alloc(len: usize) -> Result<NonNull<u8>, MemcallError> {
    // SAFETY: anonymous private mapping, no file descriptor involved.
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not allocate [Err: {}]",
            io::Error::last_os_error()
        )));
    }

    NonNull::new(ptr.cast::<u8>())
        .ok_or_else(|| MemcallError::SystemError("<memcall> mmap returned null".to_string()))
}

pub(crate) fn free(ptr: NonNull<u8>, len: usize) -> Result<(), MemcallError> {
    // SAFETY: ptr/len describe a mapping created by `alloc`.
    let result = unsafe { libc::munmap(ptr.as_ptr().cast::<libc::c_void>(), len) };
    if result != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not deallocate {:p} [Err: {}]",
            ptr.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

pub(crate) fn lock(ptr: NonNull<u8>, len: usize) -> Result<(), MemcallError> {
    let addr = ptr.as_ptr().cast::<libc::c_void>();

    // Keep the pages out of core dumps. Advisory only.
    #[cfg(target_os = "linux")]
    // SAFETY: addr/len describe a live mapping.
    unsafe {
        libc::madvise(addr, len, libc::MADV_DONTDUMP);
    }

    // SAFETY: addr/len describe a live mapping.
    let result = unsafe { libc::mlock(addr, len) };
    if result != 0 {
        let err = io::Error::last_os_error();
        let message = format!(
            "<memcall> could not acquire lock on {:p}, limit reached? [Err: {}]",
            ptr.as_ptr(),
            err
        );
        return Err(match err.raw_os_error() {
            Some(libc::ENOMEM) | Some(libc::EAGAIN) | Some(libc::EPERM) => {
                MemcallError::ResourceLimit(message)
            }
            _ => MemcallError::SystemError(message),
        });
    }
    Ok(())
}

pub(crate) fn unlock(ptr: NonNull<u8>, len: usize) -> Result<(), MemcallError> {
    // SAFETY: addr/len describe a live mapping.
    let result = unsafe { libc::munlock(ptr.as_ptr().cast::<libc::c_void>(), len) };
    if result != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not free lock on {:p} [Err: {}]",
            ptr.as_ptr(),
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

pub(crate) fn disable_core_dumps() -> Result<(), MemcallError> {
    let rlimit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: rlimit is a valid, initialized struct.
    let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlimit) };
    if result != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not set rlimit [Err: {}]",
            io::Error::last_os_error()
        )));
    }
    Ok(())
}
