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

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

/// Failure to read a configuration property.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property not found")]
    NotFound,
    #[error("Property holds {found} values, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Platform configuration properties (device tree or equivalent).
pub trait ConfigSource {
    /// Read a single `u32` property.
    fn read_u32(&self, key: &str) -> Result<u32, PropertyError>;

    /// Read a `u32` array property into `out`.
    ///
    /// The property must hold exactly `out.len()` values.
    fn read_u32_array(&self, key: &str, out: &mut [u32]) -> Result<(), PropertyError>;
}

/// In-memory [`ConfigSource`] keyed by property name.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    props: BTreeMap<String, Vec<u32>>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single-valued property.
    pub fn set_u32(&mut self, key: impl Into<String>, val: u32) -> &mut Self {
        self.props.insert(key.into(), alloc::vec![val]);
        self
    }

    /// Set an array property.
    pub fn set_u32_array(&mut self, key: impl Into<String>, vals: &[u32]) -> &mut Self {
        self.props.insert(key.into(), vals.to_vec());
        self
    }

    /// Remove a property.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.props.remove(key);
        self
    }
}

impl ConfigSource for MapConfig {
    fn read_u32(&self, key: &str) -> Result<u32, PropertyError> {
        match self.props.get(key).map(Vec::as_slice) {
            Some([val]) => Ok(*val),
            Some(vals) => Err(PropertyError::LengthMismatch {
                expected: 1,
                found: vals.len(),
            }),
            None => Err(PropertyError::NotFound),
        }
    }

    fn read_u32_array(&self, key: &str, out: &mut [u32]) -> Result<(), PropertyError> {
        let vals = self.props.get(key).ok_or(PropertyError::NotFound)?;
        if vals.len() != out.len() {
            return Err(PropertyError::LengthMismatch {
                expected: out.len(),
                found: vals.len(),
            });
        }
        out.copy_from_slice(vals);
        Ok(())
    }
}

/// Manager-wide settings that do not come from the per-ring property table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRingConfig {
    /// Prefix of the configuration keys, e.g. `mhi` for `mhi-event-rings`.
    key_prefix: String,
    /// MMIO base of the event ring doorbell array.
    doorbell_base: u64,
}

impl EventRingConfig {
    /// The default configuration key prefix
    pub const DEFAULT_KEY_PREFIX: &'static str = "mhi";

    pub fn new(doorbell_base: u64) -> Self {
        Self {
            key_prefix: String::from(Self::DEFAULT_KEY_PREFIX),
            doorbell_base,
        }
    }

    /// Use `prefix` instead of [`DEFAULT_KEY_PREFIX`](Self::DEFAULT_KEY_PREFIX)
    /// when building configuration keys.
    pub fn set_key_prefix(&mut self, prefix: impl Into<String>) {
        self.key_prefix = prefix.into();
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Set the MMIO base of the event ring doorbell array.
    pub fn set_doorbell_base(&mut self, doorbell_base: u64) {
        self.doorbell_base = doorbell_base;
    }

    pub fn doorbell_base(&self) -> u64 {
        self.doorbell_base
    }

    /// Key holding the number of event rings.
    pub fn ring_count_key(&self) -> String {
        alloc::format!("{}-event-rings", self.key_prefix)
    }

    /// Key holding the 4-tuple for ring `index`.
    pub fn ring_cfg_key(&self, index: u32) -> String {
        alloc::format!("{}-event-cfg-{}", self.key_prefix, index)
    }
}

impl Default for EventRingConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
