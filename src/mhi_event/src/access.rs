/*
Copyright 2026  The MHI Event Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Memory Access Traits for Event Ring Operations
//!
//! This module defines the [`MemOps`] trait used to read and write coherent memory
//! shared with the peer, and the [`CoherentAllocator`] trait that hands out regions
//! of that memory. Together they let the ring code run against a real DMA pool or
//! against a plain buffer in tests.

use bytemuck::Pod;

/// A region of coherent (uncached) memory visible to both host and peer.
///
/// Every region has two names: the host-local address used by the CPU and the
/// transport address the peer uses for the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoherentRegion {
    /// Host-local address of the first byte.
    pub host_addr: u64,
    /// Transport (shared-memory) address of the first byte.
    pub dma_addr: u64,
    /// Length of the region in bytes.
    pub len: usize,
}

impl CoherentRegion {
    /// Translate a host-local address inside the region to its transport address.
    ///
    /// The one-past-the-end address is accepted so that an empty region still has
    /// a translatable base.
    #[inline]
    pub fn to_dma(&self, host_addr: u64) -> Option<u64> {
        let off = host_addr.checked_sub(self.host_addr)?;
        if off > self.len as u64 {
            return None;
        }
        self.dma_addr.checked_add(off)
    }

    /// Translate a transport address inside the region back to its host-local address.
    #[inline]
    pub fn to_host(&self, dma_addr: u64) -> Option<u64> {
        let off = dma_addr.checked_sub(self.dma_addr)?;
        if off > self.len as u64 {
            return None;
        }
        self.host_addr.checked_add(off)
    }
}

/// Backend-provided access to coherent memory.
///
/// All addresses are host-local addresses previously handed out by a
/// [`CoherentAllocator`].
///
/// # Safety
///
/// Implementations must ensure that:
/// - Addresses passed to methods are valid for the duration of the call
/// - Reads and writes don't cause undefined behavior (alignment, validity)
pub trait MemOps {
    type Error;

    /// Read bytes from coherent memory.
    ///
    /// # Returns
    ///
    /// Number of bytes actually read (should equal `dst.len()` on success).
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write bytes to coherent memory.
    ///
    /// # Returns
    ///
    /// Number of bytes actually written (should equal `src.len()` on success).
    fn write(&self, addr: u64, src: &[u8]) -> Result<usize, Self::Error>;

    /// Read a Pod type at the given address.
    fn read_val<T: Pod>(&self, addr: u64) -> Result<T, Self::Error> {
        let mut val = T::zeroed();
        let bytes = bytemuck::bytes_of_mut(&mut val);

        self.read(addr, bytes)?;
        Ok(val)
    }

    /// Write a Pod type at the given address.
    fn write_val<T: Pod>(&self, addr: u64, val: T) -> Result<(), Self::Error> {
        let bytes = bytemuck::bytes_of(&val);
        self.write(addr, bytes)?;
        Ok(())
    }
}

/// Source of DMA-capable, uncached memory shared with the peer.
///
/// Every ring buffer and the context array come from here. Regions are returned
/// to the allocator exactly once, in reverse order of acquisition.
pub trait CoherentAllocator: MemOps {
    /// Allocate `size` bytes of coherent memory.
    fn alloc_coherent(&self, size: usize) -> Result<CoherentRegion, Self::Error>;

    /// Return a region previously obtained from [`alloc_coherent`](Self::alloc_coherent).
    fn free_coherent(&self, region: CoherentRegion);
}
