// Buffer allocation strategies.
//
// All large working storage (the two ring buffers and the up-row cache)
// comes through a `BufferAllocator` chosen when the decoder is built,
// so the decode core never cares which memory pool backs it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::Error;

/// Source of zeroed byte blocks for decoder working storage.
pub trait BufferAllocator {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, Error>;
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &mut A {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, Error> {
        (**self).allocate(len)
    }
}

/// Global allocator; failure is reported rather than aborting.
#[derive(Debug, Default, Clone, Copy)]
pub struct Heap;

impl BufferAllocator for Heap {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, Error> {
        let mut v = Vec::new();
        v.try_reserve_exact(len)
            .map_err(|_| Error::Allocation { requested: len })?;
        v.resize(len, 0u8);
        Ok(v.into_boxed_slice())
    }
}

/// Heap allocation with a hard per-block ceiling, for targets whose
/// memory pools cannot hand out arbitrarily large contiguous blocks.
#[derive(Debug, Clone, Copy)]
pub struct Capped {
    pub max_block: usize,
}

impl Capped {
    pub const fn new(max_block: usize) -> Self {
        Self { max_block }
    }
}

impl BufferAllocator for Capped {
    fn allocate(&mut self, len: usize) -> Result<Box<[u8]>, Error> {
        if len > self.max_block {
            log::warn!(
                "png: refusing {} byte block (limit {})",
                len,
                self.max_block
            );
            return Err(Error::Allocation { requested: len });
        }
        Heap.allocate(len)
    }
}
