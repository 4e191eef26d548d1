// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The L2 forwarding-acceleration table.
//!
//! Secondary (macvlan-style) interfaces offloaded to the switch each
//! occupy one slot; the slot index derives the station's logical
//! port as `base + 1 + slot`, so a station's port stays stable for
//! as long as it occupies the slot.
//!
//! Tables are immutable snapshots. The control path builds a full
//! replacement (growth copies every slot into a larger table) and
//! publishes it through [`crate::dynamic::Dynamic`]; the receive
//! path loads one snapshot per packet and never takes a lock. A
//! superseded table is reclaimed when its last reader drops out.

use alloc::vec::Vec;
use hostif_api::Glort;
use hostif_api::MacAddr;
use hostif_api::SyncError;

/// A fresh table holds 7 stations; creating one therefore requires
/// at least 7 free logical ports in the interface's range.
pub const L2_ACCEL_INIT_SIZE: usize = 7;

/// Absolute cap on offloaded stations per interface.
pub const MAX_STATIONS: usize = 63;

/// Opaque handle naming one secondary interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct StationId(pub u64);

/// One offloaded secondary interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub addr: MacAddr,
}

#[derive(Clone, Debug)]
pub struct L2AccelTable {
    base: Glort,
    slots: Vec<Option<Station>>,
}

impl L2AccelTable {
    pub fn new(base: Glort) -> Self {
        Self { base, slots: vec![None; L2_ACCEL_INIT_SIZE] }
    }

    pub fn base(&self) -> Glort {
        self.base
    }

    /// Slot capacity. Grows, never shrinks; the whole table is
    /// retired instead once the last station is removed.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn glort_for_slot(&self, slot: usize) -> Glort {
        self.base.offset(1 + slot as u16)
    }

    /// Steering lookup used by the receive path.
    pub fn station_for_glort(&self, glort: Glort) -> Option<&Station> {
        let raw = glort.raw();
        let first = self.base.raw() + 1;

        if raw < first || raw >= first + self.slots.len() as u16 {
            return None;
        }

        self.slots[usize::from(raw - first)].as_ref()
    }

    pub fn slot_for(&self, id: StationId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|st| st.id == id))
    }

    /// Iterate occupied slots as `(glort, station)`.
    pub fn stations(&self) -> impl Iterator<Item = (Glort, &Station)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|st| (self.glort_for_slot(i), st))
        })
    }

    /// A replacement table with `station` placed in the first empty
    /// slot, growing `2n + 1` when full. Returns the new table and
    /// the occupied slot index.
    pub fn adding(
        &self,
        station: Station,
    ) -> Result<(Self, usize), SyncError> {
        let mut next = if self.count() == self.size() {
            let mut grown = Self {
                base: self.base,
                slots: Vec::new(),
            };
            grown
                .slots
                .try_reserve_exact(self.size() * 2 + 1)
                .map_err(|_| SyncError::ResourceExhausted)?;
            grown.slots.extend(self.slots.iter().cloned());
            grown.slots.resize(self.size() * 2 + 1, None);
            grown
        } else {
            self.clone()
        };

        let Some(slot) = next.slots.iter().position(|s| s.is_none()) else {
            // Unreachable given the growth above; surfaced rather
            // than trusted.
            return Err(SyncError::CapacityExceeded(self.size() as u64));
        };

        next.slots[slot] = Some(station);
        Ok((next, slot))
    }

    /// A replacement table with `id`'s slot cleared, plus the slot
    /// index it occupied. `None` if the station is absent.
    pub fn removing(&self, id: StationId) -> Option<(Self, usize)> {
        let slot = self.slot_for(id)?;
        let mut next = self.clone();
        next.slots[slot] = None;
        Some((next, slot))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn station(n: u64) -> Station {
        Station {
            id: StationId(n),
            addr: MacAddr::from([0x02, 0, 0, 0, 0, n as u8]),
        }
    }

    #[test]
    fn glort_derivation() {
        let table = L2AccelTable::new(Glort::new(0x100));
        assert_eq!(table.glort_for_slot(0), Glort::new(0x101));
        assert_eq!(table.glort_for_slot(6), Glort::new(0x107));
    }

    #[test]
    fn growth_steps() {
        let mut table = L2AccelTable::new(Glort::new(0x100));
        assert_eq!(table.size(), 7);

        for n in 0..8 {
            let (next, slot) = table.adding(station(n)).unwrap();
            assert_eq!(slot, n as usize);
            table = next;
        }

        // 8th station forced a 7 -> 15 growth; slots kept stable.
        assert_eq!(table.size(), 15);
        assert_eq!(table.count(), 8);
        for n in 0..8 {
            assert_eq!(table.slot_for(StationId(n)), Some(n as usize));
        }

        for n in 8..16 {
            table = table.adding(station(n)).unwrap().0;
        }
        assert_eq!(table.size(), 31);
    }

    #[test]
    fn slot_reuse_after_removal() {
        let table = L2AccelTable::new(Glort::new(0x100));
        let (table, _) = table.adding(station(1)).unwrap();
        let (table, _) = table.adding(station(2)).unwrap();

        let (table, slot) = table.removing(StationId(1)).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(table.count(), 1);

        // First empty slot is reused; the glort derived from it is
        // only handed out after the explicit removal above.
        let (table, slot) = table.adding(station(3)).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(
            table.station_for_glort(Glort::new(0x101)).unwrap().id,
            StationId(3)
        );
    }

    #[test]
    fn absent_station() {
        let table = L2AccelTable::new(Glort::new(0x100));
        assert!(table.removing(StationId(9)).is_none());
        assert!(table.station_for_glort(Glort::new(0x100)).is_none());
        assert!(table.station_for_glort(Glort::new(0x200)).is_none());
    }
}
