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

//! Test helpers shared by the mhi-event integration tests, benches and fuzz targets.

pub mod doorbell;
pub mod peer;
pub mod pool;
pub mod simplelogger;

use mhi_event::MapConfig;

/// Build a configuration describing `rings` as `[descriptors, msi, intmod, flags]`
/// tuples under the default key prefix.
pub fn ring_config(rings: &[[u32; 4]]) -> MapConfig {
    let mut src = MapConfig::new();
    src.set_u32("mhi-event-rings", rings.len() as u32);
    for (i, ring) in rings.iter().enumerate() {
        src.set_u32_array(format!("mhi-event-cfg-{i}"), ring);
    }
    src
}
