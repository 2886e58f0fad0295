//! Process-wide settings for secure memory allocation.

use log::warn;
use once_cell::sync::OnceCell;

static MEMORY_POLICY: OnceCell<MemoryPolicy> = OnceCell::new();

/// Controls how [`SecureBuffer`](crate::SecureBuffer) obtains its memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPolicy {
    /// Lock buffers into RAM so they are never written to swap.
    pub lock_memory: bool,

    /// Fail allocation when locking fails instead of logging and continuing.
    ///
    /// Locking commonly fails under a small `RLIMIT_MEMLOCK`; every buffer locks
    /// at least one page.
    pub require_lock: bool,

    /// Set the process core-dump limit to zero when the policy is installed.
    pub disable_core_dumps: bool,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            lock_memory: !cfg!(feature = "no-mlock"),
            require_lock: false,
            disable_core_dumps: false,
        }
    }
}

impl MemoryPolicy {
    /// Creates a policy with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether buffers are locked into RAM.
    pub fn with_lock_memory(mut self, lock: bool) -> Self {
        self.lock_memory = lock;
        self
    }

    /// Sets whether a failed lock aborts the allocation.
    ///
    /// ```
    /// use securesecrets::MemoryPolicy;
    ///
    /// let policy = MemoryPolicy::new().with_require_lock(true);
    /// assert!(policy.require_lock);
    /// ```
    pub fn with_require_lock(mut self, require: bool) -> Self {
        self.require_lock = require;
        self
    }

    pub fn with_disable_core_dumps(mut self, disable: bool) -> Self {
        self.disable_core_dumps = disable;
        self
    }
}

/// Installs the process-wide memory policy.
///
/// Only the first call takes effect, and only if no buffer has been allocated
/// yet. Returns the rejected policy otherwise.
///
/// A failure to drop the core-dump limit is logged and does not reject the
/// policy.
pub fn set_memory_policy(policy: MemoryPolicy) -> Result<(), MemoryPolicy> {
    let disable_core_dumps = policy.disable_core_dumps;
    MEMORY_POLICY.set(policy)?;
    if disable_core_dumps {
        if let Err(e) = memcall::disable_core_dumps() {
            warn!("core dumps left enabled: {}", e);
        }
    }
    Ok(())
}

/// The policy in force for new allocations.
pub fn memory_policy() -> &'static MemoryPolicy {
    MEMORY_POLICY.get_or_init(MemoryPolicy::default)
}
