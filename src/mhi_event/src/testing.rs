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

//! Fakes for the platform collaborators, shared by the unit tests.
//!
//! These mirror `mhi_testing::pool` and `mhi_testing::doorbell`, which cannot be used
//! here because that crate links its own copy of `mhi_event`.

use std::sync::{Arc, Mutex};

use crate::access::{CoherentAllocator, CoherentRegion, MemOps};
use crate::manager::Doorbell;

/// Host-local address of the first byte of every [`TestPool`].
pub(crate) const HOST_BASE: u64 = 0x1000_0000;
/// Transport address of the first byte of every [`TestPool`].
pub(crate) const DMA_BASE: u64 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TestMemError {
    OutOfMemory,
    OutOfBounds(u64),
    WriteRejected(u64),
}

#[derive(Debug, Default)]
struct PoolState {
    mem: Vec<u8>,
    next: usize,
    allocs: usize,
    fail_at: Option<usize>,
    fail_write: Option<u64>,
    live: Vec<CoherentRegion>,
    freed: Vec<CoherentRegion>,
}

/// Bump-allocated coherent pool backed by a `Vec<u8>`.
///
/// Clones share the same memory so a test can keep a handle while the manager owns
/// another.
#[derive(Debug, Clone)]
pub(crate) struct TestPool {
    inner: Arc<Mutex<PoolState>>,
}

impl TestPool {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolState {
                mem: vec![0u8; size],
                ..Default::default()
            })),
        }
    }

    /// Make the `n`th allocation (counting from zero) fail.
    pub(crate) fn fail_alloc_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_at = Some(n);
    }

    /// Make every write starting at `addr` fail.
    pub(crate) fn fail_write_to(&self, addr: u64) {
        self.inner.lock().unwrap().fail_write = Some(addr);
    }

    pub(crate) fn allocs(&self) -> usize {
        self.inner.lock().unwrap().allocs
    }

    pub(crate) fn freed(&self) -> Vec<CoherentRegion> {
        self.inner.lock().unwrap().freed.clone()
    }

    pub(crate) fn live_regions(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }

    fn range(state: &PoolState, addr: u64, len: usize) -> Result<core::ops::Range<usize>, TestMemError> {
        let start = addr
            .checked_sub(HOST_BASE)
            .ok_or(TestMemError::OutOfBounds(addr))? as usize;
        let end = start + len;
        if end > state.mem.len() {
            return Err(TestMemError::OutOfBounds(addr));
        }
        Ok(start..end)
    }
}

impl MemOps for TestPool {
    type Error = TestMemError;

    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<usize, Self::Error> {
        let state = self.inner.lock().unwrap();
        let range = Self::range(&state, addr, dst.len())?;
        dst.copy_from_slice(&state.mem[range]);
        Ok(dst.len())
    }

    fn write(&self, addr: u64, src: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_write == Some(addr) {
            return Err(TestMemError::WriteRejected(addr));
        }
        let range = Self::range(&state, addr, src.len())?;
        state.mem[range].copy_from_slice(src);
        Ok(src.len())
    }
}

impl CoherentAllocator for TestPool {
    fn alloc_coherent(&self, size: usize) -> Result<CoherentRegion, Self::Error> {
        let mut state = self.inner.lock().unwrap();
        let nth = state.allocs;
        state.allocs += 1;

        if state.fail_at == Some(nth) || state.next + size > state.mem.len() {
            return Err(TestMemError::OutOfMemory);
        }

        let off = state.next;
        state.next = (off + size).next_multiple_of(16);
        let region = CoherentRegion {
            host_addr: HOST_BASE + off as u64,
            dma_addr: DMA_BASE + off as u64,
            len: size,
        };
        state.live.push(region);
        Ok(region)
    }

    fn free_coherent(&self, region: CoherentRegion) {
        let mut state = self.inner.lock().unwrap();
        let pos = state
            .live
            .iter()
            .position(|r| *r == region)
            .unwrap_or_else(|| panic!("double or foreign free of {region:?}"));
        state.live.remove(pos);
        state.freed.push(region);
    }
}

/// Doorbell that records every write as `(db_base, index, value)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingDoorbell {
    writes: Arc<Mutex<Vec<(u64, u32, u64)>>>,
}

impl RecordingDoorbell {
    pub(crate) fn writes(&self) -> Vec<(u64, u32, u64)> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn writes_for(&self, index: u32) -> Vec<u64> {
        self.writes()
            .into_iter()
            .filter(|(_, i, _)| *i == index)
            .map(|(_, _, v)| v)
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }
}

impl Doorbell for RecordingDoorbell {
    fn write_doorbell(&self, db_base: u64, index: u32, value: u64) {
        self.writes.lock().unwrap().push((db_base, index, value));
    }
}
