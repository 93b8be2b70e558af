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

#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::panic))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, debug_assertions)), warn(clippy::unwrap_used))]
// We use Arbitrary during fuzzing, which requires std
#![cfg_attr(not(any(test, feature = "fuzzing")), no_std)]

//! Event ring management for the host side of an MHI (modem host interface) link.
//!
//! The peer processor reports completions, state changes and errors by writing
//! event descriptors into circular buffers living in coherent memory shared with
//! the host. This crate owns those rings: it discovers their properties, allocates
//! the peer-visible context array and the ring buffers, initializes rings when the
//! link reaches the right stage, recycles consumed slots and rings the event
//! doorbell so the peer knows which slots it may fill.
//!
//! # Layers
//!
//! - [`RingBufferState`]: cursor bookkeeping for one circular buffer. Performs no
//!   locking and touches no memory.
//! - [`EventContext`] / [`EventDescriptor`]: the binary records shared with the peer.
//! - [`load_properties`]: per-ring configuration pulled from a [`ConfigSource`].
//! - [`EventRingManager`]: owns the host shadows, the shared context array and the
//!   per-ring locks, and exposes the lifecycle operations driven by link state
//!   transitions.
//!
//! Platform services are reached through small traits: [`MemOps`] and
//! [`CoherentAllocator`] for shared memory, [`Doorbell`] for the MMIO doorbell
//! write and [`IrqControl`] for masking local interrupts around ring locks.

extern crate alloc;

mod access;
mod config;
mod context;
mod error;
mod irq;
mod manager;
mod props;
mod release;
mod ring;
#[cfg(test)]
mod testing;
mod transition;

pub use access::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use irq::*;
pub use manager::*;
pub use props::*;
pub use ring::*;
pub use transition::*;
