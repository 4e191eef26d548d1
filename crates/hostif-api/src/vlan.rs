// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// Number of possible VLAN IDs; valid IDs are `0..VLAN_N_VID`.
pub const VLAN_N_VID: u16 = 4096;

/// A 12-bit VLAN ID.
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
pub struct VlanId(u16);

impl VlanId {
    pub fn new(vid: u16) -> Result<Self, u16> {
        if vid >= VLAN_N_VID {
            return Err(vid);
        }

        Ok(Self(vid))
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous run of VLAN IDs carried by a single VLAN update
/// request, so that clearing a large gap in the VLAN table costs one
/// request instead of thousands.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, Hash,
)]
pub struct VlanRange {
    pub first: u16,
    pub len: u16,
}

impl VlanRange {
    /// Every programmable VLAN: 0 is never programmed and 4095 is
    /// reserved by the switch.
    pub const ALL: Self = Self { first: 1, len: VLAN_N_VID - 2 };

    pub const fn one(vid: u16) -> Self {
        Self { first: vid, len: 1 }
    }

    pub fn contains(&self, vid: u16) -> bool {
        vid >= self.first && (vid - self.first) < self.len
    }
}

impl Display for VlanRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len == 1 {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.first + self.len - 1)
        }
    }
}

const VLAN_SET_WORDS: usize = (VLAN_N_VID as usize) / 64;

/// A set over the full VLAN ID space.
///
/// Not a wire type; this is the driver's `active_vlans` bookkeeping.
#[derive(Clone)]
pub struct VlanSet {
    words: [u64; VLAN_SET_WORDS],
}

impl Default for VlanSet {
    fn default() -> Self {
        Self::new()
    }
}

impl VlanSet {
    pub const fn new() -> Self {
        Self { words: [0; VLAN_SET_WORDS] }
    }

    pub fn set(&mut self, vid: u16) {
        debug_assert!(vid < VLAN_N_VID);
        self.words[usize::from(vid) / 64] |= 1 << (vid % 64);
    }

    pub fn clear(&mut self, vid: u16) {
        debug_assert!(vid < VLAN_N_VID);
        self.words[usize::from(vid) / 64] &= !(1 << (vid % 64));
    }

    pub fn contains(&self, vid: u16) -> bool {
        if vid >= VLAN_N_VID {
            return false;
        }

        self.words[usize::from(vid) / 64] & (1 << (vid % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Return the first member at or above `from` and below `limit`,
    /// or `limit` if there is none. Mirrors the semantics of the
    /// usual bitmap `find_next_bit`.
    pub fn find_next(&self, from: u16, limit: u16) -> u16 {
        let limit = limit.min(VLAN_N_VID);
        let mut vid = from;

        while vid < limit {
            let word = self.words[usize::from(vid) / 64] >> (vid % 64);

            if word == 0 {
                // Skip to the next word boundary.
                vid = (vid / 64 + 1) * 64;
                continue;
            }

            vid += word.trailing_zeros() as u16;
            break;
        }

        vid.min(limit)
    }
}

impl fmt::Debug for VlanSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut list = f.debug_list();
        let mut vid = self.find_next(0, VLAN_N_VID);

        while vid < VLAN_N_VID {
            list.entry(&vid);
            vid = self.find_next(vid + 1, VLAN_N_VID);
        }

        list.finish()
    }
}
