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

use core::fmt;

use crate::props::RingClass;

/// Link state transitions reported by the driver's state machine.
///
/// Only [`Ready`](Self::Ready) and [`FirmwareLoaded`](Self::FirmwareLoaded) cause
/// event rings to be populated; the remaining names are accepted so the dispatcher
/// can forward every transition unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub enum StateTransition {
    Reset,
    Ready,
    M0,
    M1,
    M2,
    M3,
    Bhi,
    Sbl,
    /// The peer's main firmware image is running.
    FirmwareLoaded,
    LinkDown,
    WakeUp,
    SysErr,
}

impl StateTransition {
    /// The ring class this transition activates, if any.
    pub fn ring_class(self) -> Option<RingClass> {
        match self {
            Self::Ready => Some(RingClass::Control),
            Self::FirmwareLoaded => Some(RingClass::Data),
            _ => None,
        }
    }
}

impl fmt::Display for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reset => "RESET",
            Self::Ready => "READY",
            Self::M0 => "M0",
            Self::M1 => "M1",
            Self::M2 => "M2",
            Self::M3 => "M3",
            Self::Bhi => "BHI",
            Self::Sbl => "SBL",
            Self::FirmwareLoaded => "AMSS",
            Self::LinkDown => "LINK_DOWN",
            Self::WakeUp => "WAKE_UP",
            Self::SysErr => "SYS_ERR",
        };
        f.write_str(name)
    }
}
