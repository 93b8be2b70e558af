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

//! Peer-visible Event Ring Records
//!
//! The layouts in this module are a binary contract with the peer firmware. Field
//! order and width must not change; the offsets are asserted at compile time.

use bytemuck::{Pod, Zeroable};

/// A single event ring element as written by the peer.
///
/// The meaning of the dwords depends on the event type encoded in `dword1` and is
/// interpreted by the per-ring consumption handler.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    /// Transport address the event refers to (e.g. a completed transfer element).
    pub ptr: u64,
    /// Completion code and length.
    pub dword0: u32,
    /// Event type and channel/ring identifiers.
    pub dword1: u32,
}

const _: () = assert!(core::mem::size_of::<EventDescriptor>() == 16);
const _: () = assert!(EventDescriptor::PTR_OFFSET == 0);
const _: () = assert!(EventDescriptor::DWORD0_OFFSET == 8);
const _: () = assert!(EventDescriptor::DWORD1_OFFSET == 12);

impl EventDescriptor {
    pub const SIZE: usize = core::mem::size_of::<Self>();
    pub const ALIGN: usize = core::mem::align_of::<Self>();

    pub const PTR_OFFSET: usize = core::mem::offset_of!(Self, ptr);
    pub const DWORD0_OFFSET: usize = core::mem::offset_of!(Self, dword0);
    pub const DWORD1_OFFSET: usize = core::mem::offset_of!(Self, dword1);

    /// Event type field (bits 16-23 of `dword1`).
    #[inline]
    pub fn event_type(&self) -> u8 {
        (self.dword1 >> 16) as u8
    }

    /// Channel or ring identifier (bits 24-31 of `dword1`).
    #[inline]
    pub fn chid(&self) -> u8 {
        (self.dword1 >> 24) as u8
    }

    /// Completion code (bits 24-31 of `dword0`).
    #[inline]
    pub fn code(&self) -> u8 {
        (self.dword0 >> 24) as u8
    }
}

/// Event context record shared with the peer, one per event ring.
///
/// Addresses are transport addresses. The host owns `ring_base`, `ring_len` and
/// `write_ptr`; the peer advances `read_ptr` as it posts events.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct EventContext {
    /// Interrupt moderation timer in bits 16-31; bits 0-15 are reserved.
    pub intmodt: u32,
    /// Ring type tag, [`EventContext::RING_TYPE_VALID`] once stamped.
    pub ring_type: u32,
    /// MSI vector the peer raises for this ring.
    pub msi_vector: u32,
    /// Base of the ring buffer.
    pub ring_base: u64,
    /// Ring length in bytes.
    pub ring_len: u64,
    /// Next slot the peer will write.
    pub read_ptr: u64,
    /// First slot the peer may not write.
    pub write_ptr: u64,
}

const _: () = assert!(core::mem::size_of::<EventContext>() == 44);
const _: () = assert!(EventContext::INTMODT_OFFSET == 0);
const _: () = assert!(EventContext::RING_TYPE_OFFSET == 4);
const _: () = assert!(EventContext::MSI_VECTOR_OFFSET == 8);
const _: () = assert!(EventContext::RING_BASE_OFFSET == 12);
const _: () = assert!(EventContext::RING_LEN_OFFSET == 20);
const _: () = assert!(EventContext::READ_PTR_OFFSET == 28);
const _: () = assert!(EventContext::WRITE_PTR_OFFSET == 36);

impl EventContext {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub const INTMODT_OFFSET: usize = core::mem::offset_of!(Self, intmodt);
    pub const RING_TYPE_OFFSET: usize = core::mem::offset_of!(Self, ring_type);
    pub const MSI_VECTOR_OFFSET: usize = core::mem::offset_of!(Self, msi_vector);
    pub const RING_BASE_OFFSET: usize = core::mem::offset_of!(Self, ring_base);
    pub const RING_LEN_OFFSET: usize = core::mem::offset_of!(Self, ring_len);
    pub const READ_PTR_OFFSET: usize = core::mem::offset_of!(Self, read_ptr);
    pub const WRITE_PTR_OFFSET: usize = core::mem::offset_of!(Self, write_ptr);

    /// Ring type tag marking a configured event ring.
    pub const RING_TYPE_VALID: u32 = 0x1;

    const INTMODT_SHIFT: u32 = 16;
    const INTMODT_MASK: u32 = 0xffff;

    /// Interrupt moderation timer value.
    #[inline]
    pub fn intmod(&self) -> u32 {
        let raw = self.intmodt;
        (raw >> Self::INTMODT_SHIFT) & Self::INTMODT_MASK
    }

    /// Set the interrupt moderation timer, preserving the reserved low bits.
    #[inline]
    pub fn set_intmod(&mut self, val: u32) {
        let raw = self.intmodt;
        self.intmodt = (raw & !(Self::INTMODT_MASK << Self::INTMODT_SHIFT))
            | ((val & Self::INTMODT_MASK) << Self::INTMODT_SHIFT);
    }

    /// Has the host stamped this context as a valid event ring?
    #[inline]
    pub fn is_valid(&self) -> bool {
        let ring_type = self.ring_type;
        ring_type == Self::RING_TYPE_VALID
    }
}
