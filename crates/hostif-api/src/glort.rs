// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A GLORT: the opaque 16-bit identifier naming a virtual switch
/// port in the hardware's forwarding tables.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Hash,
)]
pub struct Glort(u16);

impl Glort {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// The GLORT `off` ports above this one, wrapping in the 16-bit
    /// identifier space as the hardware does.
    pub const fn offset(&self, off: u16) -> Self {
        Self(self.0.wrapping_add(off))
    }
}

impl Display for Glort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// The hardware-reported DGLORT mapping register value: the
/// interface's GLORT base in the low 16 bits and the inverted
/// available-port mask in the high 16 bits.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DglortMap(u32);

impl DglortMap {
    /// Sentinel for "no mapping established yet".
    pub const NONE: Self = Self(0x0000_FFFF);

    const MASK_SHIFT: u32 = 16;

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn is_none(&self) -> bool {
        self.0 == Self::NONE.0
    }

    pub const fn base(&self) -> Glort {
        Glort::new((self.0 & 0xFFFF) as u16)
    }

    /// The number of GLORTs available above the base, as a mask.
    pub const fn mask(&self) -> u16 {
        ((!self.0) >> Self::MASK_SHIFT) as u16
    }
}

/// Configuration mapping a GLORT (or a shared range above it) onto
/// receive-queue distribution: how many bits of the frame's DGLORT
/// select an RSS queue, a QoS priority class, and a shared
/// forwarding-acceleration slot.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DglortConfig {
    pub glort: Glort,
    pub rss_bits: u8,
    pub pc_bits: u8,
    pub shared_bits: u8,
    pub inner_rss: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn map_unpacking() {
        assert!(DglortMap::NONE.is_none());
        assert_eq!(DglortMap::NONE.mask(), 0xFFFF);

        // Base 0x100, 255 ports available above it.
        let map = DglortMap::new(0xFF00_0100);
        assert!(!map.is_none());
        assert_eq!(map.base(), Glort::new(0x100));
        assert_eq!(map.mask(), 0x00FF);
    }

    #[test]
    fn offset_wraps() {
        assert_eq!(Glort::new(0xFFFF).offset(1), Glort::new(0));
        assert_eq!(Glort::new(0x0100).offset(4), Glort::new(0x0104));
    }

    #[test]
    fn glort_display() {
        assert_eq!(format!("{}", Glort::new(0x42)), "0x0042");
    }
}
