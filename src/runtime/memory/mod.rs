//! Memory boundary
//!
//! A small allocator interface plus [`SharedBuffer`], a byte buffer that draws
//! its storage through it. Reference counting stays in
//! [`Shared`](crate::runtime::shared::Shared); allocators only deal in raw
//! blocks.

mod allocator;
mod buffer;

pub use allocator::{AllocError, Allocator, BoundedAllocator, MemoryLayout, SystemAllocator};
pub use buffer::SharedBuffer;

use std::sync::Arc;

use once_cell::sync::Lazy;

static SYSTEM: Lazy<Arc<dyn Allocator>> = Lazy::new(|| Arc::new(SystemAllocator));

/// Shared handle to the global allocator.
pub fn system_allocator() -> Arc<dyn Allocator> {
    Arc::clone(&SYSTEM)
}
