//! Allocator boundary
//!
//! Raw memory only: an allocator hands out and takes back blocks described by a
//! [`MemoryLayout`]. Ownership of what lives in those blocks is handled by
//! [`SharedBuffer`](super::SharedBuffer) and `Drop`, never by the allocator.
//!
//! Allocators take `&self` so one instance can be shared between Loopers
//! behind an `Arc<dyn Allocator>`.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory allocation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Not enough memory (or budget) to satisfy the allocation
    OutOfMemory,
    /// Alignment requirements cannot be satisfied
    AlignmentError,
    /// Zero-sized requests are rejected
    ZeroSize,
}

impl fmt::Display for AllocError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            AllocError::OutOfMemory => write!(f, "out of memory"),
            AllocError::AlignmentError => write!(f, "alignment error"),
            AllocError::ZeroSize => write!(f, "zero-sized allocation"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Size and alignment of a block.
///
/// The size is rounded up to a multiple of the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    size: usize,
    align: usize,
}

impl MemoryLayout {
    /// Create a layout from size and alignment.
    ///
    /// Returns `None` if `align` is not a power of two or the rounded size
    /// overflows.
    pub fn from_size_align(
        size: usize,
        align: usize,
    ) -> Option<Self> {
        if align == 0 || !align.is_power_of_two() {
            return None;
        }

        let aligned_size = size.checked_add(align - 1)? & !(align - 1);
        Layout::from_size_align(aligned_size, align).ok()?;

        Some(Self {
            size: aligned_size,
            align,
        })
    }

    /// Layout for `len` bytes at byte alignment.
    #[inline]
    pub fn bytes(len: usize) -> Option<Self> {
        Self::from_size_align(len, 1)
    }

    /// Layout for a value of type `T`.
    pub fn new<T>() -> Self {
        Self {
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    /// Convert to `std::alloc::Layout`.
    pub fn to_std_layout(&self) -> Layout {
        // Safety: every constructor validates size and align against `Layout`.
        unsafe { Layout::from_size_align_unchecked(self.size, self.align) }
    }
}

/// Allocator boundary.
pub trait Allocator: Send + Sync {
    /// Allocate an uninitialized block.
    fn alloc(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Allocate a zero-filled block.
    fn alloc_zeroed(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Return a block.
    ///
    /// # Safety
    /// `ptr` must come from `alloc` or `alloc_zeroed` on this allocator with the
    /// same `layout`, and must not be used afterwards.
    unsafe fn dealloc(
        &self,
        ptr: NonNull<u8>,
        layout: MemoryLayout,
    );
}

/// The process-wide global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
    fn raw(
        layout: MemoryLayout,
        zeroed: bool,
    ) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSize);
        }

        let std_layout = layout.to_std_layout();
        // Safety: size is non-zero.
        let ptr = unsafe {
            if zeroed {
                alloc::alloc_zeroed(std_layout)
            } else {
                alloc::alloc(std_layout)
            }
        };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory)
    }
}

impl Allocator for SystemAllocator {
    fn alloc(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError> {
        Self::raw(layout, false)
    }

    fn alloc_zeroed(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError> {
        Self::raw(layout, true)
    }

    unsafe fn dealloc(
        &self,
        ptr: NonNull<u8>,
        layout: MemoryLayout,
    ) {
        alloc::dealloc(ptr.as_ptr(), layout.to_std_layout());
    }
}

/// A budgeted allocator over the global allocator.
///
/// Requests that would push live bytes past `limit` fail with `OutOfMemory`.
#[derive(Debug)]
pub struct BoundedAllocator {
    /// Budget in bytes
    limit: usize,
    /// Live bytes
    used: AtomicUsize,
    /// Peak live bytes
    peak: AtomicUsize,
}

impl BoundedAllocator {
    /// Create an allocator with a budget of `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Budget in bytes.
    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Snapshot of live bytes.
    #[inline]
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Snapshot of remaining budget.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used())
    }

    /// Highest live byte count seen.
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    fn reserve(
        &self,
        size: usize,
    ) -> Result<(), AllocError> {
        let limit = self.limit;
        let previous = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(size).filter(|&total| total <= limit)
            })
            .map_err(|_| AllocError::OutOfMemory)?;
        self.peak.fetch_max(previous + size, Ordering::Relaxed);
        Ok(())
    }

    fn bounded(
        &self,
        layout: MemoryLayout,
        zeroed: bool,
    ) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSize);
        }

        self.reserve(layout.size())?;
        SystemAllocator::raw(layout, zeroed).inspect_err(|_| {
            self.used.fetch_sub(layout.size(), Ordering::AcqRel);
        })
    }
}

impl Allocator for BoundedAllocator {
    fn alloc(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError> {
        self.bounded(layout, false)
    }

    fn alloc_zeroed(
        &self,
        layout: MemoryLayout,
    ) -> Result<NonNull<u8>, AllocError> {
        self.bounded(layout, true)
    }

    unsafe fn dealloc(
        &self,
        ptr: NonNull<u8>,
        layout: MemoryLayout,
    ) {
        SystemAllocator.dealloc(ptr, layout);
        self.used.fetch_sub(layout.size(), Ordering::AcqRel);
    }
}
