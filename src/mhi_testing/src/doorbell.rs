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

use std::sync::{Arc, Mutex};

use mhi_event::Doorbell;

/// One doorbell register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorbellWrite {
    pub db_base: u64,
    pub index: u32,
    pub value: u64,
}

/// [`Doorbell`] that remembers every write.
#[derive(Debug, Clone, Default)]
pub struct RecordingDoorbell {
    writes: Arc<Mutex<Vec<DoorbellWrite>>>,
}

impl RecordingDoorbell {
    pub fn writes(&self) -> Vec<DoorbellWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Values written to doorbell `index`, oldest first.
    pub fn values_for(&self, index: u32) -> Vec<u64> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.index == index)
            .map(|w| w.value)
            .collect()
    }

    pub fn clear(&self) {
        self.writes.lock().unwrap().clear();
    }
}

impl Doorbell for RecordingDoorbell {
    fn write_doorbell(&self, db_base: u64, index: u32, value: u64) {
        self.writes.lock().unwrap().push(DoorbellWrite {
            db_base,
            index,
            value,
        });
    }
}
