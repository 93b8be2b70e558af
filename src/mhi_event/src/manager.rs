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

//! Event Ring Manager
//!
//! Every event ring exists twice: as a [`RingBufferState`] shadow private to the
//! host and as an [`EventContext`] record in the context array the peer reads. The
//! two are only ever updated together, under the ring's lock, by the manager.
//!
//! Cursor ownership:
//! - the host owns the shadow cursors and the context `write_ptr`;
//! - the peer advances the context `read_ptr` as it posts events.
//!
//! The slots between the shadow read and write cursors are the ones handed to the
//! peer. Slots between the shadow read cursor and the peer's read pointer hold
//! events the host has not consumed yet.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering, fence};

use log::{debug, error, info, trace};
use spin::Mutex;
#[cfg(feature = "tracing")]
use tracing::{Span, instrument};

use crate::access::{CoherentAllocator, CoherentRegion, MemOps};
use crate::config::{ConfigSource, EventRingConfig};
use crate::context::{EventContext, EventDescriptor};
use crate::error::{AllocError, EventRingError, InitError};
use crate::irq::{IrqControl, NoIrq, with_irqsave};
use crate::props::{EventHandlerKind, EventRingProperties, RingClass, load_properties};
use crate::release::ReleaseStack;
use crate::ring::RingBufferState;
use crate::transition::StateTransition;

/// MMIO doorbell write primitive provided by the transport.
pub trait Doorbell {
    /// Write `value` to doorbell `index` of the doorbell array at `db_base`.
    fn write_doorbell(&self, db_base: u64, index: u32, value: u64);
}

/// Per-ring lifecycle.
///
/// There is no way back to `Uninitialized` short of dropping the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingLifecycle {
    Uninitialized,
    Initialized,
}

/// Point-in-time view of one ring. Addresses are transport addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSnapshot {
    pub lifecycle: RingLifecycle,
    pub base: u64,
    pub read_ptr: u64,
    pub write_ptr: u64,
    /// Ring length in bytes
    pub len: usize,
    pub el_size: usize,
    pub overwrite: bool,
    /// Slots currently handed to the peer
    pub occupied: usize,
    /// Events consumed so far
    pub events: u32,
    /// Notifications received so far
    pub msis: u32,
}

/// Host side of an event context pair, guarded by the ring lock.
#[derive(Debug)]
struct EventRing {
    shadow: RingBufferState,
    lifecycle: RingLifecycle,
}

/// Owner of every event ring on one MHI link.
pub struct EventRingManager<A, D, I = NoIrq>
where
    A: CoherentAllocator,
    D: Doorbell,
    I: IrqControl,
{
    mem: A,
    doorbell: D,
    irq: I,
    config: EventRingConfig,
    props: Vec<EventRingProperties>,
    /// Context array, absent when no rings are configured
    ctx_region: Option<CoherentRegion>,
    rings: Vec<Mutex<EventRing>>,
    ev_counters: Vec<AtomicU32>,
    msi_counters: Vec<AtomicU32>,
    /// Backing buffer of each ring, by index
    buffers: Vec<CoherentRegion>,
}

fn try_vec<T>(len: usize) -> Result<Vec<T>, AllocError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| AllocError::HostArray)?;
    Ok(v)
}

#[inline]
fn context_addr(ctx: &CoherentRegion, index: u32) -> u64 {
    ctx.host_addr + index as u64 * EventContext::SIZE as u64
}

impl<A, D, I> EventRingManager<A, D, I>
where
    A: CoherentAllocator,
    D: Doorbell,
    I: IrqControl,
{
    /// Discover, allocate and stamp every event ring described by `source`.
    ///
    /// On return every ring is allocated and its context is valid, but no ring has
    /// been populated yet; that happens on [`add_elements_to_event_rings`].
    ///
    /// [`add_elements_to_event_rings`]: Self::add_elements_to_event_rings
    pub fn from_config<S: ConfigSource + ?Sized>(
        mem: A,
        doorbell: D,
        irq: I,
        config: EventRingConfig,
        source: &S,
    ) -> Result<Self, EventRingError> {
        let props = load_properties(source, &config)?;
        let mgr = Self::create_rings(mem, doorbell, irq, config, props)?;
        mgr.init_context_array()?;
        Ok(mgr)
    }

    /// Allocate the context array, the host-side bookkeeping and one buffer per
    /// ring.
    ///
    /// Both cursors of every ring start at its base, in the shadow and in the
    /// context. If anything fails, everything obtained so far is released in
    /// reverse order before the error is returned.
    #[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
    pub fn create_rings(
        mem: A,
        doorbell: D,
        irq: I,
        config: EventRingConfig,
        props: Vec<EventRingProperties>,
    ) -> Result<Self, AllocError> {
        let count = props.len();
        let ctx_size = count
            .checked_mul(EventContext::SIZE)
            .ok_or(AllocError::Overflow)?;

        let (ctx_region, rings, ev_counters, msi_counters, buffers) = {
            let mut ctx_guard = ReleaseStack::with_capacity(&mem, 1)?;
            if count > 0 {
                let ctx = mem.alloc_coherent(ctx_size).map_err(|_| {
                    error!("Failed to allocate event context array of {ctx_size} bytes");
                    AllocError::ContextArray { size: ctx_size }
                })?;
                ctx_guard.push(ctx)?;
                info!(
                    "Allocated event context array at host {:#x}, transport {:#x}",
                    ctx.host_addr, ctx.dma_addr
                );
            }

            let mut rings = try_vec(count)?;
            let mut ev_counters = try_vec(count)?;
            let mut msi_counters = try_vec(count)?;
            let mut ring_guard = ReleaseStack::with_capacity(&mem, count)?;

            for (i, p) in props.iter().enumerate() {
                let index = i as u32;
                let size = (p.descriptor_count as usize)
                    .checked_mul(EventDescriptor::SIZE)
                    .ok_or(AllocError::Overflow)?;

                let region = mem.alloc_coherent(size).map_err(|_| {
                    error!("Failed to allocate event ring {index} of {size} bytes");
                    AllocError::RingBuffer { index, size }
                })?;
                ring_guard.push(region)?;

                if let Some(ctx) = ctx_guard.first() {
                    let addr = context_addr(&ctx, index);
                    let base = region.dma_addr;
                    mem.write_val(addr + EventContext::RING_BASE_OFFSET as u64, base)
                        .and_then(|_| mem.write_val(addr + EventContext::READ_PTR_OFFSET as u64, base))
                        .and_then(|_| mem.write_val(addr + EventContext::WRITE_PTR_OFFSET as u64, base))
                        .map_err(|_| AllocError::ContextWrite { index })?;
                }

                rings.push(Mutex::new(EventRing {
                    shadow: RingBufferState::new(region.host_addr),
                    lifecycle: RingLifecycle::Uninitialized,
                }));
                ev_counters.push(AtomicU32::new(0));
                msi_counters.push(AtomicU32::new(0));
                info!("Allocated event ring {index}");
            }

            let buffers = ring_guard.dismiss();
            let ctx_region = ctx_guard.dismiss().pop();
            (ctx_region, rings, ev_counters, msi_counters, buffers)
        };

        Ok(Self {
            mem,
            doorbell,
            irq,
            config,
            props,
            ctx_region,
            rings,
            ev_counters,
            msi_counters,
            buffers,
        })
    }

    /// Stamp every context as a valid event ring and size every shadow.
    ///
    /// Overwrite is always disabled: the host must never clobber events the peer
    /// has posted but the host has not consumed.
    #[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
    pub fn init_context_array(&self) -> Result<(), InitError> {
        for (i, ring) in self.rings.iter().enumerate() {
            let index = i as u32;
            let props = &self.props[i];
            let len = self.buffers[i].len;
            let addr = self.context_addr(index)?;

            with_irqsave(&self.irq, ring, |r| -> Result<(), InitError> {
                let mut ctx: EventContext = self
                    .mem
                    .read_val(addr)
                    .map_err(|_| InitError::Memory { index })?;
                ctx.ring_type = EventContext::RING_TYPE_VALID;
                ctx.msi_vector = props.msi_vector;
                ctx.ring_len = len as u64;
                ctx.set_intmod(props.intmod);
                self.mem
                    .write_val(addr, ctx)
                    .map_err(|_| InitError::Memory { index })?;

                r.shadow.configure(EventDescriptor::SIZE, len, false);
                fence(Ordering::SeqCst);
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Route a link state transition to the ring class it activates.
    #[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
    pub fn add_elements_to_event_rings(&self, transition: StateTransition) -> Result<(), InitError> {
        match transition.ring_class() {
            Some(class) => self.init_rings_by_class(class),
            None => {
                error!("Unrecognized event stage, {transition}");
                Err(InitError::UnrecognizedStage(transition))
            }
        }
    }

    /// Populate every still uninitialized ring of `class` and ring every doorbell.
    ///
    /// A populated ring holds `descriptor_count - 1` slots for the peer. The sweep
    /// stops at the first ring that fails; rings visited before it keep their
    /// state and have had their doorbell rung, the failing ring stays
    /// uninitialized.
    #[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
    pub fn init_rings_by_class(&self, class: RingClass) -> Result<(), InitError> {
        debug!("Initializing {class:?} event rings");
        for (i, ring) in self.rings.iter().enumerate() {
            let index = i as u32;
            let props = &self.props[i];
            let matches = props.class() == class;
            if matches {
                debug!("Initializing event ring {index}");
            }

            with_irqsave(&self.irq, ring, |r| -> Result<(), InitError> {
                if matches && r.lifecycle == RingLifecycle::Uninitialized {
                    self.populate(index, r, props.descriptor_count.saturating_sub(1) as usize)?;
                    r.lifecycle = RingLifecycle::Initialized;
                }
                self.notify(index, r)
            })
            .inspect_err(|e| error!("Failed to init event ring {index}: {e}"))?;

            debug!("Finished ev ring init {index}");
        }
        Ok(())
    }

    /// Hand `count` more slots of a ring to the peer.
    ///
    /// Either every insertion succeeds or the pair is left as it was.
    fn populate(&self, index: u32, ring: &mut EventRing, count: usize) -> Result<(), InitError> {
        let mut shadow = ring.shadow.clone();
        for _ in 0..count {
            shadow.insert().map_err(|e| InitError::ring(index, e))?;
        }
        self.sync_write_ptr(index, &shadow)?;
        ring.shadow = shadow;
        Ok(())
    }

    /// Tell the peer how far it may write into ring `index`.
    ///
    /// Repeating the call with an unchanged write cursor is harmless.
    pub fn ring_doorbell(&self, index: u32) -> Result<(), InitError> {
        let ring = self.ring(index)?;
        with_irqsave(&self.irq, ring, |r| self.notify(index, r))
    }

    fn notify(&self, index: u32, ring: &EventRing) -> Result<(), InitError> {
        let value = self.to_dma(index, ring.shadow.wp())?;
        // context writes must land before the peer can act on the doorbell
        fence(Ordering::SeqCst);
        self.doorbell
            .write_doorbell(self.config.doorbell_base(), index, value);
        trace!("Rang event doorbell {index} with {value:#x}");
        Ok(())
    }

    /// Rewind ring `index` to empty, in the shadow and in the context.
    ///
    /// The ring keeps its lifecycle state and its memory.
    #[cfg_attr(feature = "tracing", instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace"))]
    pub fn reset_ring(&self, index: u32) -> Result<(), InitError> {
        let ring = self.ring(index)?;
        let addr = self.context_addr(index)?;
        let base = self.buffers[index as usize].dma_addr;
        debug!("Resetting event index {index}");

        with_irqsave(&self.irq, ring, |r| -> Result<(), InitError> {
            self.mem
                .write_val(addr + EventContext::READ_PTR_OFFSET as u64, base)
                .and_then(|_| {
                    self.mem
                        .write_val(addr + EventContext::WRITE_PTR_OFFSET as u64, base)
                })
                .map_err(|_| InitError::Memory { index })?;
            r.shadow.reset();
            fence(Ordering::SeqCst);
            Ok(())
        })
    }

    /// Hand up to `count` free slots of ring `index` back to the peer and ring its
    /// doorbell. Returns the number of slots added.
    pub fn replenish(&self, index: u32, count: usize) -> Result<usize, InitError> {
        let ring = self.ring(index)?;
        with_irqsave(&self.irq, ring, |r| -> Result<usize, InitError> {
            if r.lifecycle != RingLifecycle::Initialized {
                return Err(InitError::NotInitialized(index));
            }
            let added = count.min(r.shadow.free_slots());
            self.populate(index, r, added)?;
            self.notify(index, r)?;
            Ok(added)
        })
    }

    /// Consume up to `max` events the peer has posted on ring `index`.
    ///
    /// Each event is passed to `handler`, then its slot is retired and handed
    /// back to the peer. The doorbell is rung once for the whole batch. The
    /// handler runs with the ring lock held and must not block.
    pub fn process_events<F>(&self, index: u32, max: usize, mut handler: F) -> Result<usize, InitError>
    where
        F: FnMut(u32, &EventDescriptor),
    {
        let ring = self.ring(index)?;
        let addr = self.context_addr(index)?;
        let region = self.buffers[index as usize];

        let processed = with_irqsave(&self.irq, ring, |r| -> Result<usize, InitError> {
            if r.lifecycle != RingLifecycle::Initialized {
                return Err(InitError::NotInitialized(index));
            }

            let peer_rp: u64 = self
                .mem
                .read_val(addr + EventContext::READ_PTR_OFFSET as u64)
                .map_err(|_| InitError::Memory { index })?;
            let peer_rp = region
                .to_host(peer_rp)
                .ok_or(InitError::Memory { index })
                .and_then(|rp| {
                    // the peer may only fill slots it was handed
                    r.shadow
                        .pending(rp)
                        .map(|_| rp)
                        .map_err(|e| InitError::ring(index, e))
                })?;

            let mut shadow = r.shadow.clone();
            let mut processed = 0;
            while processed < max && shadow.rp() != peer_rp {
                let slot = shadow.remove().map_err(|e| InitError::ring(index, e))?;
                let desc: EventDescriptor = self
                    .mem
                    .read_val(slot.addr)
                    .map_err(|_| InitError::Memory { index })?;
                handler(index, &desc);
                shadow.insert().map_err(|e| InitError::ring(index, e))?;
                processed += 1;
            }

            if processed > 0 {
                self.sync_write_ptr(index, &shadow)?;
                r.shadow = shadow;
                self.notify(index, r)?;
            }
            Ok(processed)
        })?;

        self.ev_counters[index as usize].fetch_add(processed as u32, Ordering::Relaxed);
        Ok(processed)
    }

    /// Account for a notification on ring `index` and report which handler
    /// services it.
    ///
    /// Takes no lock, so it is safe to call from the interrupt path.
    pub fn note_msi(&self, index: u32) -> Result<EventHandlerKind, InitError> {
        let counter = self
            .msi_counters
            .get(index as usize)
            .ok_or(InitError::InvalidRing(index))?;
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(self.props[index as usize].handler)
    }

    pub fn ring_state(&self, index: u32) -> Result<RingSnapshot, InitError> {
        let ring = self.ring(index)?;
        let i = index as usize;
        with_irqsave(&self.irq, ring, |r| -> Result<RingSnapshot, InitError> {
            Ok(RingSnapshot {
                lifecycle: r.lifecycle,
                base: self.to_dma(index, r.shadow.base())?,
                read_ptr: self.to_dma(index, r.shadow.rp())?,
                write_ptr: self.to_dma(index, r.shadow.wp())?,
                len: r.shadow.len(),
                el_size: r.shadow.el_size(),
                overwrite: r.shadow.overwrite(),
                occupied: r.shadow.occupied(),
                events: self.ev_counters[i].load(Ordering::Relaxed),
                msis: self.msi_counters[i].load(Ordering::Relaxed),
            })
        })
    }

    /// The property table the rings were built from.
    pub fn properties(&self) -> &[EventRingProperties] {
        &self.props
    }

    pub fn ring_count(&self) -> u32 {
        self.rings.len() as u32
    }

    pub fn config(&self) -> &EventRingConfig {
        &self.config
    }

    /// Transport address of the context array, as programmed into the peer.
    pub fn context_array_addr(&self) -> Option<u64> {
        self.ctx_region.map(|r| r.dma_addr)
    }

    fn ring(&self, index: u32) -> Result<&Mutex<EventRing>, InitError> {
        self.rings
            .get(index as usize)
            .ok_or(InitError::InvalidRing(index))
    }

    fn context_addr(&self, index: u32) -> Result<u64, InitError> {
        match &self.ctx_region {
            Some(ctx) if (index as usize) < self.rings.len() => Ok(context_addr(ctx, index)),
            _ => Err(InitError::InvalidRing(index)),
        }
    }

    fn to_dma(&self, index: u32, host_addr: u64) -> Result<u64, InitError> {
        self.buffers[index as usize]
            .to_dma(host_addr)
            .ok_or(InitError::Memory { index })
    }

    /// Mirror the shadow write cursor into the context.
    fn sync_write_ptr(&self, index: u32, shadow: &RingBufferState) -> Result<(), InitError> {
        let wp = self.to_dma(index, shadow.wp())?;
        let addr = self.context_addr(index)? + EventContext::WRITE_PTR_OFFSET as u64;
        self.mem
            .write_val(addr, wp)
            .map_err(|_| InitError::Memory { index })
    }
}

impl<A, D, I> Drop for EventRingManager<A, D, I>
where
    A: CoherentAllocator,
    D: Doorbell,
    I: IrqControl,
{
    fn drop(&mut self) {
        while let Some(region) = self.buffers.pop() {
            self.mem.free_coherent(region);
        }
        drop(core::mem::take(&mut self.msi_counters));
        drop(core::mem::take(&mut self.ev_counters));
        drop(core::mem::take(&mut self.rings));
        if let Some(ctx) = self.ctx_region.take() {
            self.mem.free_coherent(ctx);
        }
        debug!("Released event rings");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::ring::RingError;
    use crate::testing::{DMA_BASE, RecordingDoorbell, TestPool};

    const DB_BASE: u64 = 0xfe00_0000;

    type TestManager = EventRingManager<TestPool, RecordingDoorbell>;

    fn two_ring_config() -> MapConfig {
        let mut src = MapConfig::new();
        src.set_u32("mhi-event-rings", 2)
            .set_u32_array("mhi-event-cfg-0", &[8, 1, 4, 0x2])
            .set_u32_array("mhi-event-cfg-1", &[16, 2, 9, 0x1]);
        src
    }

    fn make_manager(src: &MapConfig) -> (TestManager, TestPool, RecordingDoorbell) {
        let pool = TestPool::new(0x10000);
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

    fn context(mgr: &TestManager, pool: &TestPool, index: u32) -> EventContext {
        pool.read_val(mgr.context_addr(index).unwrap()).unwrap()
    }

    fn set_peer_rp(mgr: &TestManager, pool: &TestPool, index: u32, rp: u64) {
        let addr = mgr.context_addr(index).unwrap() + EventContext::READ_PTR_OFFSET as u64;
        pool.write_val(addr, rp).unwrap();
    }

    #[test]
    fn test_context_array_is_stamped() {
        let (mgr, pool, db) = make_manager(&two_ring_config());

        assert_eq!(mgr.ring_count(), 2);
        // context array first, then one buffer per ring
        assert_eq!(pool.allocs(), 3);
        assert_eq!(mgr.context_array_addr(), Some(DMA_BASE));
        assert!(db.writes().is_empty());

        for (index, n) in [(0u32, 8usize), (1, 16)] {
            let ctx = context(&mgr, &pool, index);
            let snap = mgr.ring_state(index).unwrap();

            assert!(ctx.is_valid());
            assert_eq!({ ctx.ring_len }, (n * EventDescriptor::SIZE) as u64);
            assert_eq!({ ctx.ring_base }, snap.base);
            assert_eq!({ ctx.read_ptr }, snap.base);
            assert_eq!({ ctx.write_ptr }, snap.base);
            assert_eq!(snap.read_ptr, snap.base);
            assert_eq!(snap.write_ptr, snap.base);
            assert_eq!(snap.len, n * EventDescriptor::SIZE);
            assert_eq!(snap.el_size, EventDescriptor::SIZE);
            assert!(!snap.overwrite);
            assert_eq!(snap.lifecycle, RingLifecycle::Uninitialized);
        }

        let ctx0 = context(&mgr, &pool, 0);
        assert_eq!({ ctx0.msi_vector }, 1);
        assert_eq!(ctx0.intmod(), 4);
        let ctx1 = context(&mgr, &pool, 1);
        assert_eq!({ ctx1.msi_vector }, 2);
        assert_eq!(ctx1.intmod(), 9);
    }

    #[test]
    fn test_ready_initializes_control_rings_only() {
        let (mgr, pool, db) = make_manager(&two_ring_config());

        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();

        let ring0 = mgr.ring_state(0).unwrap();
        assert_eq!(ring0.lifecycle, RingLifecycle::Initialized);
        assert_eq!(ring0.occupied, 7);
        assert_eq!(ring0.write_ptr, ring0.base + 7 * 16);
        assert_eq!({ context(&mgr, &pool, 0).write_ptr }, ring0.write_ptr);

        let ring1 = mgr.ring_state(1).unwrap();
        assert_eq!(ring1.lifecycle, RingLifecycle::Uninitialized);
        assert_eq!(ring1.write_ptr, ring1.base);

        // every ring in the sweep is notified
        assert_eq!(
            db.writes(),
            vec![(DB_BASE, 0, ring0.write_ptr), (DB_BASE, 1, ring1.base)]
        );
    }

    #[test]
    fn test_repeated_sweep_only_rings_doorbells() {
        let (mgr, _pool, db) = make_manager(&two_ring_config());

        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        let first = mgr.ring_state(0).unwrap();
        db.clear();

        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        assert_eq!(mgr.ring_state(0).unwrap(), first);
        assert_eq!(db.writes_for(0), vec![first.write_ptr]);
    }

    #[test]
    fn test_firmware_loaded_initializes_data_rings() {
        let (mgr, _pool, _db) = make_manager(&two_ring_config());

        mgr.add_elements_to_event_rings(StateTransition::FirmwareLoaded)
            .unwrap();

        assert_eq!(
            mgr.ring_state(0).unwrap().lifecycle,
            RingLifecycle::Uninitialized
        );
        let ring1 = mgr.ring_state(1).unwrap();
        assert_eq!(ring1.lifecycle, RingLifecycle::Initialized);
        assert_eq!(ring1.occupied, 15);
    }

    #[test]
    fn test_other_transitions_are_rejected() {
        let (mgr, _pool, db) = make_manager(&two_ring_config());

        assert_eq!(
            mgr.add_elements_to_event_rings(StateTransition::M0),
            Err(InitError::UnrecognizedStage(StateTransition::M0))
        );
        assert!(db.writes().is_empty());
    }

    #[test]
    fn test_reset_rewinds_both_views() {
        let (mgr, pool, _db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        let base = mgr.ring_state(0).unwrap().base;
        set_peer_rp(&mgr, &pool, 0, base + 3 * 16);

        mgr.reset_ring(0).unwrap();
        let once = mgr.ring_state(0).unwrap();
        mgr.reset_ring(0).unwrap();
        let twice = mgr.ring_state(0).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.read_ptr, base);
        assert_eq!(twice.write_ptr, base);
        assert_eq!(twice.lifecycle, RingLifecycle::Initialized);

        let ctx = context(&mgr, &pool, 0);
        assert_eq!({ ctx.read_ptr }, base);
        assert_eq!({ ctx.write_ptr }, base);
    }

    #[test]
    fn test_replenish_after_reset() {
        let (mgr, _pool, db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        mgr.reset_ring(0).unwrap();
        db.clear();

        assert_eq!(mgr.replenish(0, 100).unwrap(), 7);
        assert_eq!(mgr.replenish(0, 1).unwrap(), 0);

        let snap = mgr.ring_state(0).unwrap();
        assert_eq!(snap.occupied, 7);
        assert_eq!(db.writes_for(0), vec![snap.write_ptr, snap.write_ptr]);
    }

    #[test]
    fn test_replenish_requires_initialized_ring() {
        let (mgr, _pool, _db) = make_manager(&two_ring_config());
        assert_eq!(mgr.replenish(1, 1), Err(InitError::NotInitialized(1)));
    }

    #[test]
    fn test_process_events_recycles_slots() {
        let (mgr, pool, db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        let start = mgr.ring_state(0).unwrap();
        let host_base = mgr.buffers[0].host_addr;

        for i in 0..3u64 {
            let desc = EventDescriptor {
                ptr: 0x100 + i,
                dword0: 0,
                dword1: 0x0022_0000,
            };
            pool.write_val(host_base + i * 16, desc).unwrap();
        }
        set_peer_rp(&mgr, &pool, 0, start.base + 3 * 16);
        db.clear();

        let mut seen = Vec::new();
        let n = mgr
            .process_events(0, 10, |idx, desc| seen.push((idx, desc.ptr)))
            .unwrap();

        assert_eq!(n, 3);
        assert_eq!(seen, vec![(0, 0x100), (0, 0x101), (0, 0x102)]);

        let snap = mgr.ring_state(0).unwrap();
        assert_eq!(snap.read_ptr, start.base + 3 * 16);
        // consumed slots go straight back to the peer, wrapping past the end
        assert_eq!(snap.write_ptr, start.base + 2 * 16);
        assert_eq!(snap.occupied, 7);
        assert_eq!(snap.events, 3);
        assert_eq!(db.writes_for(0), vec![snap.write_ptr]);
        assert_eq!({ context(&mgr, &pool, 0).write_ptr }, snap.write_ptr);

        // nothing new posted
        assert_eq!(mgr.process_events(0, 10, |_, _| {}).unwrap(), 0);
    }

    #[test]
    fn test_process_events_honours_budget() {
        let (mgr, pool, _db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        let base = mgr.ring_state(0).unwrap().base;
        set_peer_rp(&mgr, &pool, 0, base + 5 * 16);

        assert_eq!(mgr.process_events(0, 2, |_, _| {}).unwrap(), 2);
        assert_eq!(mgr.process_events(0, 10, |_, _| {}).unwrap(), 3);
    }

    #[test]
    fn test_process_events_rejects_bogus_peer_pointer() {
        let (mgr, pool, _db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        let before = mgr.ring_state(0).unwrap();
        set_peer_rp(&mgr, &pool, 0, before.base + 8);

        assert!(matches!(
            mgr.process_events(0, 10, |_, _| {}),
            Err(InitError::Ring { index: 0, .. })
        ));
        assert_eq!(mgr.ring_state(0).unwrap(), before);
    }

    #[test]
    fn test_process_events_rejects_peer_pointer_past_write_cursor() {
        let (mgr, pool, _db) = make_manager(&two_ring_config());
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        mgr.reset_ring(0).unwrap();
        assert_eq!(mgr.replenish(0, 2).unwrap(), 2);
        let before = mgr.ring_state(0).unwrap();

        // only two slots were handed out
        set_peer_rp(&mgr, &pool, 0, before.base + 5 * 16);

        let mut calls = 0;
        assert_eq!(
            mgr.process_events(0, 10, |_, _| calls += 1),
            Err(InitError::Ring {
                index: 0,
                source: RingError::OutOfRange(mgr.buffers[0].host_addr + 5 * 16),
            })
        );
        assert_eq!(calls, 0);
        assert_eq!(mgr.ring_state(0).unwrap(), before);
        assert_eq!({ context(&mgr, &pool, 0).write_ptr }, before.write_ptr);

        // the peer filling exactly what it was given is fine
        set_peer_rp(&mgr, &pool, 0, before.base + 2 * 16);
        assert_eq!(mgr.process_events(0, 10, |_, _| {}).unwrap(), 2);
    }

    #[test]
    fn test_sweep_stops_at_failing_ring() {
        let mut src = MapConfig::new();
        src.set_u32("mhi-event-rings", 3)
            .set_u32_array("mhi-event-cfg-0", &[4, 0, 0, 0x2])
            .set_u32_array("mhi-event-cfg-1", &[4, 1, 0, 0x2])
            .set_u32_array("mhi-event-cfg-2", &[4, 2, 0, 0x2]);
        let (mgr, pool, db) = make_manager(&src);
        pool.fail_write_to(mgr.context_addr(1).unwrap() + EventContext::WRITE_PTR_OFFSET as u64);

        assert_eq!(
            mgr.add_elements_to_event_rings(StateTransition::Ready),
            Err(InitError::Memory { index: 1 })
        );

        let ring0 = mgr.ring_state(0).unwrap();
        assert_eq!(ring0.lifecycle, RingLifecycle::Initialized);
        assert_eq!(ring0.occupied, 3);
        for index in [1, 2] {
            let snap = mgr.ring_state(index).unwrap();
            assert_eq!(snap.lifecycle, RingLifecycle::Uninitialized);
            assert_eq!(snap.occupied, 0);
            assert_eq!(snap.write_ptr, snap.base);
            assert_eq!({ context(&mgr, &pool, index).write_ptr }, snap.base);
        }
        assert_eq!(db.writes(), vec![(DB_BASE, 0, ring0.write_ptr)]);
    }

    #[test]
    fn test_note_msi_reports_handler() {
        let (mgr, _pool, _db) = make_manager(&two_ring_config());

        assert_eq!(mgr.note_msi(0), Ok(EventHandlerKind::Msi));
        assert_eq!(mgr.note_msi(0), Ok(EventHandlerKind::Msi));
        assert_eq!(mgr.note_msi(1), Ok(EventHandlerKind::Alternate));
        assert_eq!(mgr.note_msi(2), Err(InitError::InvalidRing(2)));
        assert_eq!(mgr.ring_state(0).unwrap().msis, 2);
    }

    #[test]
    fn test_invalid_index() {
        let (mgr, _pool, _db) = make_manager(&two_ring_config());

        assert_eq!(mgr.ring_doorbell(2), Err(InitError::InvalidRing(2)));
        assert_eq!(mgr.reset_ring(7), Err(InitError::InvalidRing(7)));
        assert_eq!(mgr.ring_state(2), Err(InitError::InvalidRing(2)));
    }

    #[test]
    fn test_drop_releases_everything_in_reverse() {
        let (mgr, pool, _db) = make_manager(&two_ring_config());
        let ctx = mgr.ctx_region.unwrap();
        let rings = mgr.buffers.clone();

        drop(mgr);

        assert_eq!(pool.freed(), vec![rings[1], rings[0], ctx]);
        assert_eq!(pool.live_regions(), 0);
    }

    #[test]
    fn test_allocation_failure_rolls_back() {
        let mut src = two_ring_config();
        src.set_u32("mhi-event-rings", 3)
            .set_u32_array("mhi-event-cfg-2", &[4, 3, 0, 0x3]);
        let props = load_properties(&src, &EventRingConfig::default()).unwrap();

        // allocation 0 is the context array, allocation k + 1 is ring k
        for fail_at in 0..4 {
            let pool = TestPool::new(0x10000);
            pool.fail_alloc_at(fail_at);

            let res = EventRingManager::create_rings(
                pool.clone(),
                RecordingDoorbell::default(),
                NoIrq,
                EventRingConfig::default(),
                props.clone(),
            );

            match fail_at {
                0 => assert!(matches!(res, Err(AllocError::ContextArray { .. }))),
                k => assert!(matches!(
                    res,
                    Err(AllocError::RingBuffer { index, .. }) if index as usize == k - 1
                )),
            }
            assert_eq!(pool.live_regions(), 0, "leak with failure at {fail_at}");
            assert_eq!(pool.freed().len(), fail_at);

            // context array is released last
            let freed = pool.freed();
            if let Some(last) = freed.last() {
                assert_eq!(last.dma_addr, DMA_BASE);
            }
            assert!(freed.windows(2).all(|w| w[0].dma_addr > w[1].dma_addr));
        }
    }

    #[test]
    fn test_no_rings_allocates_nothing() {
        let mut src = MapConfig::new();
        src.set_u32("mhi-event-rings", 0);
        let (mgr, pool, db) = make_manager(&src);

        assert_eq!(mgr.ring_count(), 0);
        assert_eq!(pool.allocs(), 0);
        assert_eq!(mgr.context_array_addr(), None);
        mgr.add_elements_to_event_rings(StateTransition::Ready).unwrap();
        assert!(db.writes().is_empty());
    }
}
