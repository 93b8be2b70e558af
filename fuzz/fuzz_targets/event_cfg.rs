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

#![no_main]

use libfuzzer_sys::fuzz_target;
use mhi_event::{
    EventRingConfig, EventRingError, EventRingManager, MapConfig, NoIrq, RingLifecycle,
};
use mhi_testing::doorbell::RecordingDoorbell;
use mhi_testing::pool::SharedPool;

// Arbitrary ring counts and tuples, including missing and short tuples.
// Whatever happens, no region may outlive the manager.
fuzz_target!(|data: (u8, Vec<Vec<u32>>)| {
    let (count, tuples) = data;

    let mut src = MapConfig::new();
    src.set_u32("mhi-event-rings", count as u32);
    for (i, tuple) in tuples.iter().enumerate() {
        src.set_u32_array(format!("mhi-event-cfg-{i}"), tuple);
    }

    let pool = SharedPool::new(1 << 20);
    let res = EventRingManager::from_config(
        pool.clone(),
        RecordingDoorbell::default(),
        NoIrq,
        EventRingConfig::default(),
        &src,
    );

    match res {
        Ok(mgr) => {
            assert_eq!(mgr.ring_count(), count as u32);
            for index in 0..mgr.ring_count() {
                let snap = mgr.ring_state(index).unwrap();
                assert_eq!(snap.lifecycle, RingLifecycle::Uninitialized);
                assert_eq!(snap.read_ptr, snap.base);
                assert_eq!(snap.write_ptr, snap.base);
                assert!(!snap.overwrite);
            }
        }
        Err(EventRingError::Config(_)) => assert_eq!(pool.allocs(), 0),
        Err(_) => {}
    }
    assert!(pool.live().is_empty());
});
