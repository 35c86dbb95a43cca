//! Byte buffers drawn from an [`Allocator`].

use core::ptr::NonNull;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::allocator::{AllocError, Allocator, MemoryLayout};

/// A fixed-length byte buffer whose storage comes from an [`Allocator`].
///
/// The block is returned to the same allocator on drop. Wrap the buffer in a
/// [`Shared`](crate::runtime::shared::Shared) to hand it to several owners.
pub struct SharedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: MemoryLayout,
    allocator: Arc<dyn Allocator>,
}

// Safety: the buffer owns its block exclusively; mutation requires `&mut self`.
unsafe impl Send for SharedBuffer {}
unsafe impl Sync for SharedBuffer {}

impl SharedBuffer {
    /// Allocate `len` zeroed bytes.
    pub fn zeroed(
        len: usize,
        allocator: Arc<dyn Allocator>,
    ) -> Result<Self, AllocError> {
        let layout = Self::layout_for(len)?;
        let ptr = allocator.alloc_zeroed(layout)?;
        Ok(Self {
            ptr,
            len,
            layout,
            allocator,
        })
    }

    /// Allocate a copy of `bytes`.
    pub fn from_slice(
        bytes: &[u8],
        allocator: Arc<dyn Allocator>,
    ) -> Result<Self, AllocError> {
        let layout = Self::layout_for(bytes.len())?;
        let ptr = allocator.alloc(layout)?;
        // Safety: the block holds at least `bytes.len()` bytes and is fresh.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        }
        Ok(Self {
            ptr,
            len: bytes.len(),
            layout,
            allocator,
        })
    }

    fn layout_for(len: usize) -> Result<MemoryLayout, AllocError> {
        if len == 0 {
            return Err(AllocError::ZeroSize);
        }
        MemoryLayout::bytes(len).ok_or(AllocError::OutOfMemory)
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: zero-length buffers cannot be created.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Layout of the underlying block.
    #[inline]
    pub fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// Contents.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // Safety: `ptr` is valid for `len` initialized bytes while `self` lives.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutable contents.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Deref for SharedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for SharedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl Drop for SharedBuffer {
    fn drop(&mut self) {
        // Safety: the block came from this allocator with this layout.
        unsafe { self.allocator.dealloc(self.ptr, self.layout) };
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}
