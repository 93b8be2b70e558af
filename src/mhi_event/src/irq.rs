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

//! Local interrupt masking around ring locks.
//!
//! Ring state is touched from both thread context and the event interrupt path, so
//! a ring lock must never be taken with the local interrupt enabled. Environments
//! without interrupts (user space, tests) use [`NoIrq`].

use spin::Mutex;

/// Save-and-disable / restore of the local interrupt state.
pub trait IrqControl {
    /// Opaque saved interrupt state.
    type State;

    /// Disable local interrupts, returning the state to restore.
    fn save_and_disable(&self) -> Self::State;

    /// Restore interrupts to a previously saved state.
    fn restore(&self, state: Self::State);
}

/// [`IrqControl`] for contexts that never take interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIrq;

impl IrqControl for NoIrq {
    type State = ();

    #[inline]
    fn save_and_disable(&self) {}

    #[inline]
    fn restore(&self, _state: ()) {}
}

/// Run `f` with `lock` held and local interrupts disabled.
///
/// Interrupts are restored after the lock is released.
pub(crate) fn with_irqsave<I, T, R>(irq: &I, lock: &Mutex<T>, f: impl FnOnce(&mut T) -> R) -> R
where
    I: IrqControl + ?Sized,
{
    let flags = irq.save_and_disable();
    let ret = {
        let mut guard = lock.lock();
        f(&mut guard)
    };
    irq.restore(flags);
    ret
}
