//! Allocation counting.
//!
//! [`CountingAllocator`] wraps the system allocator and keeps a running total
//! of bytes handed out. The runner samples the total right before and right
//! after the timed window; the difference is what the case allocated.
//!
//! The binary installs it with:
//!
//! ```ignore
//! #[global_allocator]
//! static ALLOCATOR: CountingAllocator = CountingAllocator::new();
//! ```

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Source of a monotonically increasing allocated-bytes total.
pub trait AllocationCounter: Sync {
    /// Total bytes allocated since process start.
    fn allocated_bytes(&self) -> u64;

    /// Whether the counter is actually observing allocations.
    fn is_active(&self) -> bool {
        true
    }
}

/// Global allocator that counts bytes and allocation calls.
#[derive(Debug)]
pub struct CountingAllocator {
    allocated: AtomicU64,
    allocations: AtomicU64,
    active: AtomicBool,
}

impl CountingAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocated: AtomicU64::new(0),
            allocations: AtomicU64::new(0),
            active: AtomicBool::new(false),
        }
    }

    /// Number of allocation calls observed.
    #[must_use]
    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    fn record(&self, bytes: usize) {
        self.allocated.fetch_add(bytes as u64, Ordering::Relaxed);
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Relaxed);
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationCounter for CountingAllocator {
    fn allocated_bytes(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// False until the allocator has served at least one request, i.e. until
    /// it is registered as the global allocator and in use.
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

// SAFETY: every call is forwarded unchanged to `System`; the counters are
// plain atomics and never allocate.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc` requirements
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.record(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc_zeroed` requirements
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.record(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was returned by this allocator with `layout`
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::realloc` requirements
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            // Growth counts as a fresh allocation of the new block
            self.record(new_size);
        }
        new_ptr
    }
}
