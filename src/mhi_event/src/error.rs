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

use thiserror::Error;

use crate::ring::RingError;
use crate::transition::StateTransition;

/// Failure to read the event ring property table.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Event ring count is missing from the configuration")]
    MissingRingCount,
    #[error("Configuration for event ring {0} is missing")]
    MissingRingConfig(u32),
    #[error("Configuration for event ring {index} holds {found} values, expected 4")]
    MalformedRingConfig { index: u32, found: usize },
    #[error("Event ring {0} is configured with zero descriptors")]
    ZeroDescriptors(u32),
    #[error("Failed to allocate the host-side property table")]
    HostAlloc,
}

/// Failure to obtain memory while creating the event rings.
///
/// Whatever was obtained before the failure has been released again by the time
/// the caller sees one of these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("Failed to allocate the event context array ({size} bytes)")]
    ContextArray { size: usize },
    #[error("Failed to allocate host-side ring state")]
    HostArray,
    #[error("Failed to allocate the buffer for event ring {index} ({size} bytes)")]
    RingBuffer { index: u32, size: usize },
    #[error("Failed to record event ring {index} in the context array")]
    ContextWrite { index: u32 },
    #[error("Ring size overflows the address space")]
    Overflow,
}

/// Failure while initializing or operating on a ring.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("Unrecognized event stage {0}")]
    UnrecognizedStage(StateTransition),
    #[error("Event ring {index} filled up before the requested elements were added")]
    RingFull { index: u32 },
    #[error("Event ring {index}: {source}")]
    Ring { index: u32, source: RingError },
    #[error("Invalid event ring index {0}")]
    InvalidRing(u32),
    #[error("Event ring {0} is not initialized")]
    NotInitialized(u32),
    #[error("Shared memory access failed for event ring {index}")]
    Memory { index: u32 },
}

impl InitError {
    /// Attach a ring index to a [`RingError`].
    pub(crate) fn ring(index: u32, err: RingError) -> Self {
        match err {
            RingError::Full => Self::RingFull { index },
            source => Self::Ring { index, source },
        }
    }
}

/// Any error produced by the event ring manager.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRingError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Allocation error: {0}")]
    Alloc(#[from] AllocError),
    #[error("Init error: {0}")]
    Init(#[from] InitError),
}
