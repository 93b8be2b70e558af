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

//! Event Ring Property Table
//!
//! Each event ring is described by a 4-tuple in the platform configuration:
//! `<descriptor count, msi vector, interrupt moderation, flags>`. The table is read
//! once at bring-up and never resized.

use alloc::vec::Vec;

use bitflags::bitflags;
use log::{error, info};
#[cfg(feature = "tracing")]
use tracing::{Span, instrument};

use crate::config::{ConfigSource, EventRingConfig, PropertyError};
use crate::error::ConfigError;

bitflags! {
    /// Per-ring flags word from the configuration tuple.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventRingFlags: u32 {
        /// Ring carries data-path events (otherwise control).
        const DATA    = 1 << 0;
        /// Ring is serviced by the host's own MSI handler.
        const MANAGED = 1 << 1;
    }
}

/// Which state transition activates a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingClass {
    Control,
    Data,
}

/// Interrupt handler variant servicing a ring, fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventHandlerKind {
    /// The host's MSI handler drains the ring.
    Msi,
    /// An alternate interrupt source (e.g. a hardware accelerator) owns the ring.
    Alternate,
}

/// Number of `u32` values in a per-ring configuration tuple.
pub const EVENT_CFG_LEN: usize = 4;

/// Static configuration of one event ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRingProperties {
    /// Number of descriptors in the ring.
    pub descriptor_count: u32,
    /// MSI vector the peer raises for this ring.
    pub msi_vector: u32,
    /// Interrupt moderation timer value.
    pub intmod: u32,
    /// Raw flags word.
    pub flags: EventRingFlags,
    /// Handler selected from [`EventRingFlags::MANAGED`].
    pub handler: EventHandlerKind,
}

impl EventRingProperties {
    /// Build the properties for a ring from its configuration tuple.
    pub fn from_tuple(raw: [u32; EVENT_CFG_LEN]) -> Self {
        let [descriptor_count, msi_vector, intmod, flags] = raw;
        let flags = EventRingFlags::from_bits_retain(flags);
        let handler = if flags.contains(EventRingFlags::MANAGED) {
            EventHandlerKind::Msi
        } else {
            EventHandlerKind::Alternate
        };

        Self {
            descriptor_count,
            msi_vector,
            intmod,
            flags,
            handler,
        }
    }

    #[inline]
    pub fn class(&self) -> RingClass {
        if self.flags.contains(EventRingFlags::DATA) {
            RingClass::Data
        } else {
            RingClass::Control
        }
    }
}

/// Read the event ring property table from `source`.
///
/// Either every ring is described or an error is returned; a partially read table
/// is discarded.
#[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
pub fn load_properties<S: ConfigSource + ?Sized>(
    source: &S,
    config: &EventRingConfig,
) -> Result<Vec<EventRingProperties>, ConfigError> {
    let count = source
        .read_u32(&config.ring_count_key())
        .map_err(|e| {
            error!("Failed to pull event ring info from config, {e}");
            ConfigError::MissingRingCount
        })?;

    let mut props = Vec::new();
    props
        .try_reserve_exact(count as usize)
        .map_err(|_| ConfigError::HostAlloc)?;

    for index in 0..count {
        let mut raw = [0u32; EVENT_CFG_LEN];
        source
            .read_u32_array(&config.ring_cfg_key(index), &mut raw)
            .map_err(|e| {
                error!("Failed to pull ev ring {index} info from config {e}");
                match e {
                    PropertyError::NotFound => ConfigError::MissingRingConfig(index),
                    PropertyError::LengthMismatch { found, .. } => {
                        ConfigError::MalformedRingConfig { index, found }
                    }
                }
            })?;

        let ring = EventRingProperties::from_tuple(raw);
        if ring.descriptor_count == 0 {
            error!("Ev ring {index} has no descriptors");
            return Err(ConfigError::ZeroDescriptors(index));
        }

        info!(
            "Pulled ev ring {index}, desc: {:#x}, msi_vec: {:#x}, intmod {} flags {:#x}",
            ring.descriptor_count,
            ring.msi_vector,
            ring.intmod,
            ring.flags.bits()
        );
        props.push(ring);
    }

    Ok(props)
}
