//! Page-aligned memory allocation for in-memory pages.

use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ptr::NonNull;

/// OS page size used for alignment.
const OS_PAGE_ALIGNMENT: usize = 4096;

/// A zero-initialized, page-aligned buffer of one page.
///
/// # Safety
///
/// This type uses `std::alloc` directly and maintains the following invariants:
/// - `ptr` is always valid and aligned to `OS_PAGE_ALIGNMENT`
/// - Memory is allocated for exactly `layout.size()` bytes
/// - Memory is deallocated exactly once in `Drop`
pub struct PageData {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl PageData {
    /// Allocates a zeroed page of `page_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero or overflows a `Layout`. Aborts via
    /// `handle_alloc_error` if the allocator fails.
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be non-zero");
        let layout = match Layout::from_size_align(page_size, OS_PAGE_ALIGNMENT) {
            Ok(layout) => layout,
            Err(e) => panic!("invalid page layout for {} bytes: {}", page_size, e),
        };

        // SAFETY: layout has non-zero size and a power-of-two alignment
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        Self { ptr, layout }
    }

    /// Returns the page size of this buffer.
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false; pages are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns a slice to the underlying memory.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Returns a mutable slice to the underlying memory.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for layout.size() bytes and uniquely borrowed
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for PageData {
    fn drop(&mut self) {
        // SAFETY: ptr and layout match the values used in alloc_zeroed()
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

// SAFETY: PageData owns its allocation exclusively
unsafe impl Send for PageData {}
// SAFETY: shared access only hands out `&[u8]`
unsafe impl Sync for PageData {}

impl AsRef<[u8]> for PageData {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for PageData {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}
