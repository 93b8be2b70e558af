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

use mhi_event::{EventRingConfig, EventRingManager, MapConfig, NoIrq};
use mhi_testing::doorbell::RecordingDoorbell;
use mhi_testing::pool::SharedPool;
use mhi_testing::ring_config;
use mhi_testing::simplelogger::SimpleLogger;

pub const DB_BASE: u64 = 0xfc00_0000;
pub const POOL_SIZE: usize = 1 << 20;

pub type TestManager = EventRingManager<SharedPool, RecordingDoorbell, NoIrq>;

/// Ring 0: control, 8 descriptors, MSI handler. Ring 1: data, 16 descriptors,
/// alternate handler.
pub fn two_rings() -> MapConfig {
    ring_config(&[[8, 1, 3, 0x2], [16, 2, 7, 0x1]])
}

pub fn new_manager(src: &MapConfig) -> (TestManager, SharedPool, RecordingDoorbell) {
    SimpleLogger::initialize_test_logger();

    let pool = SharedPool::new(POOL_SIZE);
    let db = RecordingDoorbell::default();
    let mgr = EventRingManager::from_config(
        pool.clone(),
        db.clone(),
        NoIrq,
        EventRingConfig::new(DB_BASE),
        src,
    )
    .unwrap();
    (mgr, pool, db)
}
