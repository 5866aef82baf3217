//! Provide memory accounting for leak detection.
//!
//! [`XmlMemCounter`] wraps the system allocator and keeps the number of live bytes
//! and live blocks. Install it with `#[global_allocator]` in a binary or a test to
//! make [`xml_mem_used`] and [`xml_mem_blocks`] meaningful. Without it, both stay `0`.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    sync::atomic::{AtomicUsize, Ordering},
};

static MEM_USED: AtomicUsize = AtomicUsize::new(0);
static MEM_BLOCKS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_MEM_USED: Cell<isize> = const { Cell::new(0) };
}

/// A global allocator that counts live allocations.
#[derive(Debug, Default)]
pub struct XmlMemCounter {
    inner: System,
}

impl XmlMemCounter {
    pub const fn new() -> Self {
        Self { inner: System }
    }

    fn record_alloc(size: usize) {
        MEM_USED.fetch_add(size, Ordering::Relaxed);
        MEM_BLOCKS.fetch_add(1, Ordering::Relaxed);
        // The thread-local is gone during thread teardown.
        THREAD_MEM_USED
            .try_with(|used| used.set(used.get() + size as isize))
            .ok();
    }

    fn record_dealloc(size: usize) {
        MEM_USED.fetch_sub(size, Ordering::Relaxed);
        MEM_BLOCKS.fetch_sub(1, Ordering::Relaxed);
        THREAD_MEM_USED
            .try_with(|used| used.set(used.get() - size as isize))
            .ok();
    }
}

unsafe impl GlobalAlloc for XmlMemCounter {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { self.inner.dealloc(ptr, layout) };
        Self::record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new.is_null() {
            Self::record_dealloc(layout.size());
            Self::record_alloc(new_size);
        }
        new
    }
}

/// Provides the amount of memory currently allocated.
#[doc(alias = "xmlMemUsed")]
pub fn xml_mem_used() -> usize {
    MEM_USED.load(Ordering::Relaxed)
}

/// Provides the number of memory areas currently allocated.
#[doc(alias = "xmlMemBlocks")]
pub fn xml_mem_blocks() -> usize {
    MEM_BLOCKS.load(Ordering::Relaxed)
}

/// Net amount of memory allocated by the current thread.
///
/// Memory freed by another thread than the one that allocated it skews this value.
pub fn xml_thread_mem_used() -> isize {
    THREAD_MEM_USED.with(|used| used.get())
}
