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

//! Scoped release of coherent regions.
//!
//! Bring-up obtains several regions in sequence. Each one is pushed onto a
//! [`ReleaseStack`] as soon as it is obtained; if bring-up bails out early the stack
//! is dropped and returns every region to the allocator, last acquired first. On
//! success the regions are taken back out with [`ReleaseStack::dismiss`].

use alloc::vec::Vec;

use crate::access::{CoherentAllocator, CoherentRegion};
use crate::error::AllocError;

pub(crate) struct ReleaseStack<'a, A: CoherentAllocator + ?Sized> {
    mem: &'a A,
    regions: Vec<CoherentRegion>,
}

impl<'a, A: CoherentAllocator + ?Sized> ReleaseStack<'a, A> {
    /// Create a stack able to hold `capacity` regions without reallocating.
    pub(crate) fn with_capacity(mem: &'a A, capacity: usize) -> Result<Self, AllocError> {
        let mut regions = Vec::new();
        regions
            .try_reserve_exact(capacity)
            .map_err(|_| AllocError::HostArray)?;
        Ok(Self { mem, regions })
    }

    /// Register `region` for release.
    pub(crate) fn push(&mut self, region: CoherentRegion) -> Result<(), AllocError> {
        if self.regions.len() == self.regions.capacity() {
            // hand the region back before reporting, it is not tracked yet
            self.mem.free_coherent(region);
            return Err(AllocError::HostArray);
        }
        self.regions.push(region);
        Ok(())
    }

    /// The first region registered, if any.
    pub(crate) fn first(&self) -> Option<CoherentRegion> {
        self.regions.first().copied()
    }

    /// Keep every region, returning them in acquisition order.
    pub(crate) fn dismiss(mut self) -> Vec<CoherentRegion> {
        core::mem::take(&mut self.regions)
    }
}

impl<A: CoherentAllocator + ?Sized> Drop for ReleaseStack<'_, A> {
    fn drop(&mut self) {
        while let Some(region) = self.regions.pop() {
            self.mem.free_coherent(region);
        }
    }
}
