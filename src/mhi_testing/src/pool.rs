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

//! A coherent memory pool living in an ordinary heap buffer.

use std::sync::{Arc, Mutex};

use mhi_event::{CoherentAllocator, CoherentRegion, MemOps};

/// Host-local address of the first byte of a [`SharedPool`].
pub const POOL_HOST_BASE: u64 = 0x2000_0000;
/// Transport address of the first byte of a [`SharedPool`].
pub const POOL_DMA_BASE: u64 = 0x4000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    Exhausted,
    InjectedFailure,
    WriteRejected(u64),
    OutOfBounds { addr: u64, len: usize },
}

#[derive(Debug, Default)]
struct Inner {
    mem: Vec<u8>,
    next: usize,
    allocs: usize,
    fail_at: Option<usize>,
    fail_write: Option<u64>,
    live: Vec<CoherentRegion>,
    freed: Vec<CoherentRegion>,
}

/// Bump allocator over a heap buffer, shared by every clone.
///
/// Counts allocations and records frees so tests can check that every region is
/// released exactly once and in which order.
#[derive(Debug, Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<Inner>>,
}

impl SharedPool {
    pub fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                mem: vec![0u8; size],
                ..Default::default()
            })),
        }
    }

    /// Make allocation number `n` (zero based) fail.
    pub fn fail_alloc_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_at = Some(n);
    }

    /// Make every write starting at host address `addr` fail.
    pub fn fail_write_to(&self, addr: u64) {
        self.inner.lock().unwrap().fail_write = Some(addr);
    }

    /// Number of allocation attempts so far, including failed ones.
    pub fn allocs(&self) -> usize {
        self.inner.lock().unwrap().allocs
    }

    /// Regions returned so far, in the order they were returned.
    pub fn freed(&self) -> Vec<CoherentRegion> {
        self.inner.lock().unwrap().freed.clone()
    }

    /// Regions handed out and not yet returned.
    pub fn live(&self) -> Vec<CoherentRegion> {
        self.inner.lock().unwrap().live.clone()
    }

    /// Host-local address for a transport address inside the pool.
    pub fn to_host(&self, dma_addr: u64) -> Option<u64> {
        let len = self.inner.lock().unwrap().mem.len() as u64;
        let off = dma_addr.checked_sub(POOL_DMA_BASE)?;
        (off < len).then_some(POOL_HOST_BASE + off)
    }

    fn span(inner: &Inner, addr: u64, len: usize) -> Result<std::ops::Range<usize>, PoolError> {
        let oob = PoolError::OutOfBounds { addr, len };
        let start = addr.checked_sub(POOL_HOST_BASE).ok_or(oob)? as usize;
        let end = start.checked_add(len).ok_or(oob)?;
        if end > inner.mem.len() {
            return Err(oob);
        }
        Ok(start..end)
    }
}

impl MemOps for SharedPool {
    type Error = PoolError;

    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<usize, Self::Error> {
        let inner = self.inner.lock().unwrap();
        let span = Self::span(&inner, addr, dst.len())?;
        dst.copy_from_slice(&inner.mem[span]);
        Ok(dst.len())
    }

    fn write(&self, addr: u64, src: &[u8]) -> Result<usize, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_write == Some(addr) {
            return Err(PoolError::WriteRejected(addr));
        }
        let span = Self::span(&inner, addr, src.len())?;
        inner.mem[span].copy_from_slice(src);
        Ok(src.len())
    }
}

impl CoherentAllocator for SharedPool {
    fn alloc_coherent(&self, size: usize) -> Result<CoherentRegion, Self::Error> {
        let mut inner = self.inner.lock().unwrap();
        let nth = inner.allocs;
        inner.allocs += 1;

        if inner.fail_at == Some(nth) {
            return Err(PoolError::InjectedFailure);
        }
        if inner.next + size > inner.mem.len() {
            return Err(PoolError::Exhausted);
        }

        let off = inner.next;
        inner.next = (off + size).next_multiple_of(64);
        let region = CoherentRegion {
            host_addr: POOL_HOST_BASE + off as u64,
            dma_addr: POOL_DMA_BASE + off as u64,
            len: size,
        };
        inner.live.push(region);
        Ok(region)
    }

    fn free_coherent(&self, region: CoherentRegion) {
        let mut inner = self.inner.lock().unwrap();
        match inner.live.iter().position(|r| *r == region) {
            Some(pos) => {
                inner.live.remove(pos);
                inner.freed.push(region);
            }
            None => panic!("region {region:?} freed twice or never allocated"),
        }
    }
}
