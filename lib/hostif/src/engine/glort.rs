// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! GLORT namespace allocation.
//!
//! Each interface owns one contiguous range of logical-port
//! identifiers carved out of the hardware-reported DGLORT mapping;
//! the VFs and the PF share the namespace under the policy below.

use hostif_api::DglortMap;
use hostif_api::Glort;

/// The contiguous `[base, base + count)` GLORT range owned by an
/// interface. A count of 0 means no logical ports are usable yet;
/// callers treat that as "not established", not as an error.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GlortRange {
    pub base: Glort,
    pub count: u16,
}

impl GlortRange {
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, glort: Glort) -> bool {
        let raw = u32::from(glort.raw());
        let base = u32::from(self.base.raw());
        raw >= base && raw < base + u32::from(self.count)
    }

    /// Derive this interface's GLORT range from the hardware mapping
    /// and the number of configured VFs.
    ///
    /// Three configurations are supported:
    ///  1: VFs consume all but the last 1
    ///  2: VFs and PF split the mask with a possible gap between
    ///  3: VFs allocated the first 64, all others belong to the PF
    pub fn request(map: DglortMap, total_vfs: u16) -> Self {
        let base = map.base();

        // Nothing we can do until the mapping is established.
        if map.is_none() {
            return Self { base, count: 0 };
        }

        let mask = map.mask();

        if mask <= total_vfs {
            Self { base: base.offset(mask), count: 1 }
        } else if mask < 64 {
            let count = (mask + 1) / 2;
            Self { base: base.offset(count), count }
        } else {
            Self { base: base.offset(64), count: mask - 63 }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unestablished_map() {
        let range = GlortRange::request(DglortMap::NONE, 4);
        assert!(range.is_empty());
    }

    #[test]
    fn vfs_consume_all_but_one() {
        // Mask of 4 ports, 8 VFs configured: the interface gets
        // exactly one port at the top of the mask.
        let map = DglortMap::new(!(4u32 << 16) & 0xFFFF_0000 | 0x0100);
        assert_eq!(map.mask(), 4);
        let range = GlortRange::request(map, 8);
        assert_eq!(range, GlortRange { base: Glort::new(0x104), count: 1 });
    }

    #[test]
    fn small_mask_split() {
        // Mask 15, no VFs: split roughly in half.
        let map = DglortMap::new(!(15u32 << 16) & 0xFFFF_0000 | 0x0200);
        assert_eq!(map.mask(), 15);
        let range = GlortRange::request(map, 0);
        assert_eq!(range, GlortRange { base: Glort::new(0x208), count: 8 });
    }

    #[test]
    fn large_mask_pf_above_64() {
        let map = DglortMap::new(!(0xFFu32 << 16) & 0xFFFF_0000);
        assert_eq!(map.mask(), 0xFF);
        let range = GlortRange::request(map, 16);
        assert_eq!(range, GlortRange { base: Glort::new(64), count: 192 });
        assert!(range.contains(Glort::new(64)));
        assert!(range.contains(Glort::new(255)));
        assert!(!range.contains(Glort::new(256)));
    }

    #[test]
    fn high_base_wraps_identifier_space() {
        // A mapping reported with its base at the top of the 16-bit
        // space wraps instead of panicking.
        let map = DglortMap::new((!(0xFFu32 << 16) & 0xFFFF_0000) | 0xFFFF);
        assert_eq!(map.mask(), 0xFF);
        assert_eq!(map.base(), Glort::new(0xFFFF));

        let range = GlortRange::request(map, 0);
        assert_eq!(range, GlortRange { base: Glort::new(0x003F), count: 192 });
    }

    #[test]
    fn branches_cover_mask_space() {
        // Policy branches are mutually exclusive and exhaustive for
        // any mask/VF combination, and the range never escapes the
        // mask-derived space.
        for mask in [0u16, 1, 2, 31, 63, 64, 255, 0x7FFF] {
            for vfs in [0u16, 1, 48, 64] {
                let map = DglortMap::new(
                    !(u32::from(mask) << 16) & 0xFFFF_0000,
                );
                if map.is_none() {
                    continue;
                }
                let range = GlortRange::request(map, vfs);
                let top = u32::from(range.base.raw()) + u32::from(range.count);
                assert!(top <= u32::from(mask) + 1,
                    "mask {mask} vfs {vfs} escapes: {range:?}");
            }
        }
    }
}
