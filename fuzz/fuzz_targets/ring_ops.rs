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

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mhi_event::{
    EventDescriptor, EventRingConfig, EventRingManager, NoIrq, StateTransition,
};
use mhi_testing::doorbell::RecordingDoorbell;
use mhi_testing::peer::FakePeer;
use mhi_testing::pool::SharedPool;
use mhi_testing::ring_config;

#[derive(Arbitrary, Debug)]
enum Op {
    Transition(StateTransition),
    Reset(u8),
    Replenish(u8, u8),
    Post(u8, u64),
    Process(u8, u8),
    Msi(u8),
}

// Interleave link transitions, peer activity and host servicing on three rings and
// check that the one-free-slot rule is never broken.
fuzz_target!(|ops: Vec<Op>| {
    let pool = SharedPool::new(1 << 16);
    let mgr = EventRingManager::from_config(
        pool.clone(),
        RecordingDoorbell::default(),
        NoIrq,
        EventRingConfig::default(),
        &ring_config(&[[4, 0, 0, 0x2], [8, 1, 0, 0x1], [2, 2, 0, 0x3]]),
    )
    .unwrap();
    let peer = FakePeer::new(pool.clone(), mgr.context_array_addr().unwrap());
    let rings = mgr.ring_count();

    for op in ops {
        match op {
            Op::Transition(t) => {
                let res = mgr.add_elements_to_event_rings(t);
                assert_eq!(res.is_ok(), t.ring_class().is_some());
            }
            Op::Reset(i) => {
                let _ = mgr.reset_ring(i as u32 % rings);
            }
            Op::Replenish(i, n) => {
                let _ = mgr.replenish(i as u32 % rings, n as usize);
            }
            Op::Post(i, ptr) => {
                let index = i as u32 % rings;
                let ctx = peer.context(index);
                let (rp, wp) = (ctx.read_ptr, ctx.write_ptr);
                if rp != wp {
                    peer.post(
                        index,
                        EventDescriptor {
                            ptr,
                            dword0: 0,
                            dword1: 0,
                        },
                    );
                }
            }
            Op::Process(i, max) => {
                let _ = mgr.process_events(i as u32 % rings, max as usize, |_, _| {});
            }
            Op::Msi(i) => {
                mgr.note_msi(i as u32 % rings).unwrap();
            }
        }

        for index in 0..rings {
            let snap = mgr.ring_state(index).unwrap();
            assert!(snap.occupied < snap.len / snap.el_size);
        }
    }
});
