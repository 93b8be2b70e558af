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

//! Peer firmware stand-in.

use mhi_event::{EventContext, EventDescriptor, MemOps};

use crate::pool::SharedPool;

/// Posts events the way the peer does: write the descriptor at the context read
/// pointer, then advance the read pointer.
pub struct FakePeer {
    pool: SharedPool,
    ctx_array: u64,
}

impl FakePeer {
    /// `ctx_array` is the transport address of the event context array.
    pub fn new(pool: SharedPool, ctx_array: u64) -> Self {
        Self { pool, ctx_array }
    }

    fn ctx_host(&self, index: u32) -> u64 {
        let dma = self.ctx_array + index as u64 * EventContext::SIZE as u64;
        self.pool.to_host(dma).unwrap()
    }

    pub fn context(&self, index: u32) -> EventContext {
        self.pool.read_val(self.ctx_host(index)).unwrap()
    }

    /// Post one event on ring `index`.
    ///
    /// Panics if the host has not made the slot available.
    pub fn post(&self, index: u32, desc: EventDescriptor) {
        let ctx = self.context(index);
        let (base, len, rp, wp) = (ctx.ring_base, ctx.ring_len, ctx.read_ptr, ctx.write_ptr);
        assert_ne!(rp, wp, "event ring {index} has no free slot for the peer");

        self.pool
            .write_val(self.pool.to_host(rp).unwrap(), desc)
            .unwrap();

        let mut next = rp + EventDescriptor::SIZE as u64;
        if next >= base + len {
            next = base;
        }
        self.pool
            .write_val(
                self.ctx_host(index) + EventContext::READ_PTR_OFFSET as u64,
                next,
            )
            .unwrap();
    }
}
