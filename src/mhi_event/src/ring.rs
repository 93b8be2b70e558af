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

//! Circular Buffer Cursor Bookkeeping
//!
//! [`RingBufferState`] tracks the read and write cursors of one fixed-capacity
//! circular buffer living in coherent memory. Cursors are host-local addresses,
//! always element aligned, and always inside `[base, base + len)`.
//!
//! ```text
//!   base                                          base + len
//!    │                                                 │
//!    v                                                 v
//!    ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!    │    │ r  │ x  │ x  │ w  │    │    │    │   x = occupied
//!    └────┴────┴────┴────┴────┴────┴────┴────┘
//!           ^              ^
//!          rp             wp
//! ```
//!
//! `rp == wp` means empty. One slot is always left free so that a full ring
//! (`next(wp) == rp`) can be told apart from an empty one, which caps the usable
//! capacity at `capacity - 1` elements unless overwrite is enabled.
//!
//! The primitive takes no locks and touches no memory: callers hold the owning
//! ring's lock and read or write slot contents themselves.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring is full")]
    Full,
    #[error("Ring is empty")]
    Empty,
    #[error("Ring has no element size or length configured")]
    Unconfigured,
    #[error("Address {0:#x} is outside the ring or not element aligned")]
    OutOfRange(u64),
}

/// A slot claimed from (or retired by) the ring.
///
/// The handle is only meaningful while the ring's lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Element index within the ring.
    pub index: usize,
    /// Host-local address of the slot.
    pub addr: u64,
}

/// Host-local shadow of one circular buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingBufferState {
    /// Host-local base address of the backing region
    base: u64,
    /// Consumer cursor
    rp: u64,
    /// Producer cursor
    wp: u64,
    /// Bytes per element
    el_size: usize,
    /// Ring length in bytes
    len: usize,
    /// Whether a full ring may drop its oldest element on insert
    overwrite: bool,
}

impl RingBufferState {
    /// Create a shadow for a buffer at `base`. Both cursors start at the base.
    ///
    /// The ring is unusable until [`configure`](Self::configure) sets its geometry.
    pub fn new(base: u64) -> Self {
        Self {
            base,
            rp: base,
            wp: base,
            el_size: 0,
            len: 0,
            overwrite: false,
        }
    }

    /// Set element size, byte length and overwrite policy.
    ///
    /// Cursors are left untouched.
    pub fn configure(&mut self, el_size: usize, len: usize, overwrite: bool) {
        self.el_size = el_size;
        self.len = len;
        self.overwrite = overwrite;
    }

    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub fn rp(&self) -> u64 {
        self.rp
    }

    #[inline]
    pub fn wp(&self) -> u64 {
        self.wp
    }

    #[inline]
    pub fn el_size(&self) -> usize {
        self.el_size
    }

    /// Ring length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Does the ring hold no elements?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rp == self.wp
    }

    #[inline]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Number of element slots in the ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        match self.el_size {
            0 => 0,
            sz => self.len / sz,
        }
    }

    /// Number of elements between the read and write cursors.
    pub fn occupied(&self) -> usize {
        self.span(self.rp, self.wp)
    }

    /// Number of elements from the read cursor up to `addr`, wrapping.
    ///
    /// Fails with [`RingError::OutOfRange`] when `addr` is not a cursor position
    /// or lies beyond the write cursor.
    pub fn pending(&self, addr: u64) -> Result<usize, RingError> {
        let addr = self.check_cursor(addr)?;
        let n = self.span(self.rp, addr);
        if n > self.occupied() {
            return Err(RingError::OutOfRange(addr));
        }
        Ok(n)
    }

    /// Elements between two cursor positions, walking forward from `from`.
    fn span(&self, from: u64, to: u64) -> usize {
        if self.el_size == 0 || self.len == 0 {
            return 0;
        }
        let from = (from - self.base) as usize;
        let to = (to - self.base) as usize;
        let bytes = if to >= from { to - from } else { self.len - from + to };
        bytes / self.el_size
    }

    /// Number of elements that can still be inserted without overwriting.
    pub fn free_slots(&self) -> usize {
        self.capacity().saturating_sub(self.occupied() + 1)
    }

    /// Element index of a cursor address.
    #[inline]
    fn index_of(&self, addr: u64) -> usize {
        (addr - self.base) as usize / self.el_size
    }

    /// Cursor position one element after `ptr`, wrapping at the end of the ring.
    #[inline]
    fn next(&self, ptr: u64) -> u64 {
        let off = (ptr - self.base) as usize + self.el_size;
        if off >= self.len {
            self.base
        } else {
            self.base + off as u64
        }
    }

    #[inline]
    fn check_configured(&self) -> Result<(), RingError> {
        if self.el_size == 0 || self.len < self.el_size {
            return Err(RingError::Unconfigured);
        }
        Ok(())
    }

    /// Claim the slot at the write cursor and advance the cursor by one element.
    ///
    /// Fails with [`RingError::Full`] when advancing would make the write cursor
    /// catch up with the read cursor and overwrite is disabled; the ring is left
    /// unchanged in that case. With overwrite enabled the oldest element is dropped
    /// instead.
    pub fn insert(&mut self) -> Result<Slot, RingError> {
        self.check_configured()?;

        let next = self.next(self.wp);
        if next == self.rp {
            if !self.overwrite {
                return Err(RingError::Full);
            }
            self.rp = self.next(self.rp);
        }

        let slot = Slot {
            index: self.index_of(self.wp),
            addr: self.wp,
        };
        self.wp = next;
        Ok(slot)
    }

    /// Retire the slot at the read cursor and advance the cursor by one element.
    pub fn remove(&mut self) -> Result<Slot, RingError> {
        self.check_configured()?;

        if self.is_empty() {
            return Err(RingError::Empty);
        }

        let slot = Slot {
            index: self.index_of(self.rp),
            addr: self.rp,
        };
        self.rp = self.next(self.rp);
        Ok(slot)
    }

    /// Validate that `addr` is an element-aligned cursor position inside the ring.
    pub fn check_cursor(&self, addr: u64) -> Result<u64, RingError> {
        self.check_configured()?;

        let off = addr.checked_sub(self.base).ok_or(RingError::OutOfRange(addr))?;
        if off >= self.len as u64 || off % self.el_size as u64 != 0 {
            return Err(RingError::OutOfRange(addr));
        }
        Ok(addr)
    }

    /// Rewind both cursors to the base of the ring.
    pub fn reset(&mut self) {
        self.rp = self.base;
        self.wp = self.base;
    }
}
