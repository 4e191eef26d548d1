// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Per-interface orchestration of address, VLAN, and reception-mode
//! state.
//!
//! Stack-level events (VLAN add/remove, address-list changes, flag
//! changes) land here, get translated into queued MAC/VLAN requests
//! and forwarding-table updates, and are replayed wholesale by
//! [`Interface::restore_host_state`] after a device reset.
//!
//! Two locks are in play. The queue serializes its own list
//! manipulation; everything else — `active_vlans`, the packed VLAN
//! cursor, the xcast mode, the synced address lists — is serialized
//! by the interface's own mutex, held across any operation that must
//! present a consistent view while enqueuing. Neither lock is ever
//! held across a transport call.

use super::err;
use super::glort::GlortRange;
use super::l2accel::L2AccelTable;
use super::l2accel::Station;
use super::l2accel::StationId;
use super::l2accel::L2_ACCEL_INIT_SIZE;
use super::l2accel::MAX_STATIONS;
use super::queue::DrainStatus;
use super::queue::MacVlanQueue;
use super::HostHw;
use super::Mailbox;
use crate::ddi::sync::KMutex;
use crate::dynamic::Dynamic;
use crate::dynamic::Snapshot;
use alloc::vec::Vec;
use bitflags::bitflags;
use hostif_api::DglortConfig;
use hostif_api::DglortMap;
use hostif_api::Glort;
use hostif_api::MacAddr;
use hostif_api::SyncError;
use hostif_api::VlanRange;
use hostif_api::VlanSet;
use hostif_api::XcastMode;
use hostif_api::VLAN_N_VID;

bitflags! {
    /// Stack-level interface flags feeding reception-mode selection.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct IfFlags: u32 {
        const UP = 1 << 0;
        const BROADCAST = 1 << 1;
        const MULTICAST = 1 << 2;
        const ALLMULTI = 1 << 3;
        const PROMISC = 1 << 4;
    }
}

/// When set in a receive ring's VLAN word, the ring's default VLAN
/// tag is suppressed on untagged frames.
pub const VLAN_CLEAR: u16 = 1 << 15;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacType {
    Pf,
    Vf,
}

/// Static configuration for one host interface.
#[derive(Clone, Copy, Debug)]
pub struct InterfaceConfig {
    pub mac_type: MacType,
    /// The interface's own station address.
    pub addr: MacAddr,
    pub default_vid: u16,
    /// The hardware enforces an administratively assigned VLAN; the
    /// interface may not program VLANs itself.
    pub vlan_override: bool,
    /// IES tagging: VLAN filtering is bypassed at the hardware
    /// level, so explicit VLAN table programming is skipped.
    pub ies: bool,
    pub rss_mask: u16,
    pub qos_mask: u16,
}

struct IntfcState {
    addr: MacAddr,
    flags: IfFlags,
    /// Administratively down: VLAN changes are recorded locally and
    /// resynchronized wholesale on the next bring-up.
    down: bool,
    /// The VLAN most recently pushed through `update_vid`, with the
    /// add/remove flag carried in the bits above the VLAN ID space.
    vid: u16,
    active_vlans: VlanSet,
    xcast_mode: XcastMode,
    uc_synced: Vec<MacAddr>,
    mc_synced: Vec<MacAddr>,
    /// Per-ring default VLAN words, high bit = suppression.
    ring_vids: Vec<u16>,
}

pub struct Interface<M: Mailbox, H: HostHw> {
    cfg: InterfaceConfig,
    glort: GlortRange,
    mbx: M,
    hw: H,
    queue: MacVlanQueue,
    l2: Dynamic<Option<L2AccelTable>>,
    data: KMutex<IntfcState>,
}

/// Highest-priority flag wins.
fn xcast_mode_from_flags(flags: IfFlags) -> XcastMode {
    if flags.contains(IfFlags::PROMISC) {
        XcastMode::Promisc
    } else if flags.contains(IfFlags::ALLMULTI) {
        XcastMode::AllMulti
    } else if flags.intersects(IfFlags::BROADCAST | IfFlags::MULTICAST) {
        XcastMode::Multi
    } else {
        XcastMode::None
    }
}

/// Find-last-set: index of the highest set bit, 1-based; 0 for an
/// empty mask.
fn fls(mask: u16) -> u8 {
    (16 - mask.leading_zeros()) as u8
}

impl<M: Mailbox, H: HostHw> Interface<M, H> {
    pub fn new(
        cfg: InterfaceConfig,
        map: DglortMap,
        total_vfs: u16,
        num_rx_rings: usize,
        mbx: M,
        hw: H,
    ) -> Self {
        let glort = GlortRange::request(map, total_vfs);

        Self {
            cfg,
            glort,
            mbx,
            hw,
            queue: MacVlanQueue::new(),
            l2: Dynamic::from(None),
            data: KMutex::new(IntfcState {
                addr: cfg.addr,
                flags: IfFlags::empty(),
                down: true,
                vid: 0,
                active_vlans: VlanSet::new(),
                xcast_mode: XcastMode::None,
                uc_synced: Vec::new(),
                mc_synced: Vec::new(),
                ring_vids: vec![cfg.default_vid; num_rx_rings],
            }),
        }
    }

    pub fn glort_range(&self) -> GlortRange {
        self.glort
    }

    pub fn queue(&self) -> &MacVlanQueue {
        &self.queue
    }

    pub fn addr(&self) -> MacAddr {
        self.data.lock().addr
    }

    pub fn xcast_mode(&self) -> XcastMode {
        self.data.lock().xcast_mode
    }

    /// Per-ring default VLAN words for ring programming.
    pub fn ring_vids(&self) -> Vec<u16> {
        self.data.lock().ring_vids.clone()
    }

    /// The forwarding-acceleration table, for the receive path. Load
    /// one snapshot per packet; never cache it across a scheduling
    /// point.
    pub fn l2_accel(&self) -> Snapshot<Option<L2AccelTable>> {
        self.l2.load()
    }

    pub fn set_down(&self, down: bool) {
        self.data.lock().down = down;
    }

    /// Drain the request queue toward the switch manager. Called
    /// from the service worker.
    pub fn service_macvlan_queue(&self) -> DrainStatus {
        self.queue.drain(&self.mbx)
    }

    /// Whether queued messages may be pushed toward the host. VF
    /// interfaces are exempt so VF-to-PF traffic is not blocked at
    /// initialization.
    fn host_mbx_ready(&self) -> bool {
        self.cfg.mac_type == MacType::Vf || self.mbx.is_ready()
    }

    /// The next active VLAN strictly above `vid`, with the default
    /// VLAN treated as implicitly active: scanning below it can
    /// never run past it. Returns `VLAN_N_VID` when exhausted.
    fn next_active_vlan(&self, state: &IntfcState, vid: u16) -> u16 {
        let default_vid = self.cfg.default_vid;
        let limit =
            if vid < default_vid { default_vid } else { VLAN_N_VID };

        state.active_vlans.find_next(vid + 1, limit)
    }

    /// Queue one MAC update for `addr` under every active VLAN.
    fn queue_mac_all_vlans(
        &self,
        state: &IntfcState,
        addr: MacAddr,
        set: bool,
    ) -> Result<(), SyncError> {
        let mut vid = self.next_active_vlan(state, 0);

        while vid < VLAN_N_VID {
            self.queue.queue_mac_request(self.glort.base, addr, vid, set)?;
            vid = self.next_active_vlan(state, vid);
        }

        Ok(())
    }

    /// Re-drive every synced address under the VLAN recorded by the
    /// packed cursor, after a VLAN was added or removed.
    fn unsync_addresses_for_vid(
        &self,
        state: &IntfcState,
    ) -> Result<(), SyncError> {
        let set = state.vid >= VLAN_N_VID;
        let vid = state.vid & (VLAN_N_VID - 1);

        for addr in state.uc_synced.iter().chain(state.mc_synced.iter()) {
            self.queue.queue_mac_request(self.glort.base, *addr, vid, set)?;
        }

        Ok(())
    }

    /// VLAN add/remove from the stack.
    pub fn update_vid(&self, vid: u16, set: bool) -> Result<(), SyncError> {
        // Updates do not apply to VLAN 0.
        if vid == 0 {
            return Ok(());
        }

        if vid >= VLAN_N_VID {
            return Err(SyncError::VlanOutOfRange(vid));
        }

        // The override policy denies self-assigned VLANs, but
        // removal is still allowed so the VLAN device can be torn
        // down; the local bitmask is kept accurate below either way.
        if set && self.cfg.vlan_override {
            return Err(SyncError::PolicyDenied);
        }

        let mut state = self.data.lock();

        if set {
            state.active_vlans.set(vid);
        } else {
            state.active_vlans.clear(vid);
        }

        // Suppress a ring's default VLAN tag while that VLAN is
        // explicitly active.
        let IntfcState { active_vlans, ring_vids, .. } = &mut *state;
        for ring_vid in ring_vids.iter_mut() {
            let rx_vid = *ring_vid & (VLAN_N_VID - 1);

            if active_vlans.contains(rx_vid) {
                *ring_vid |= VLAN_CLEAR;
            } else {
                *ring_vid &= !VLAN_CLEAR;
            }
        }

        // Overridden VLAN state: removal requests would be silently
        // ignored by the switch, so stop here.
        if self.cfg.vlan_override {
            return Ok(());
        }

        // The default VLAN's table entries are managed implicitly,
        // never removed explicitly.
        if !set && vid == self.cfg.default_vid {
            return Ok(());
        }

        // A down interface resyncs wholesale on the next bring-up.
        if state.down {
            return Ok(());
        }

        // In promiscuous or IES mode the VLAN table is bypassed at
        // the hardware level; only a VF must always program it.
        let bypass = (state.flags.contains(IfFlags::PROMISC) || self.cfg.ies)
            && self.cfg.mac_type != MacType::Vf;

        if !bypass {
            self.queue.queue_vlan_request(VlanRange::one(vid), 0, set)?;
        }

        // Our own station address follows the VLAN.
        let addr = state.addr;
        self.queue.queue_mac_request(self.glort.base, addr, vid, set)?;

        // Record the VLAN cursor prior to re-driving the address
        // lists under it.
        state.vid = vid + if set { VLAN_N_VID } else { 0 };

        self.unsync_addresses_for_vid(&state)
    }

    /// Enqueue removal requests for every VLAN not currently active,
    /// coalescing each gap into a single range request. Used when
    /// leaving promiscuous mode to rebuild filtering.
    fn clear_unused_vlans(&self, state: &IntfcState) -> Result<(), SyncError> {
        let mut prev: u32 = 0;
        let mut vid: u32 = 0;

        while prev < u32::from(VLAN_N_VID) {
            if prev != vid {
                self.queue.queue_vlan_request(
                    VlanRange {
                        first: prev as u16,
                        len: (vid - prev) as u16,
                    },
                    0,
                    false,
                )?;
            }

            prev = vid + 1;
            vid = u32::from(self.next_active_vlan(state, vid as u16));
        }

        Ok(())
    }

    /// Diff the stack's address lists against what was last synced,
    /// producing one request per changed address per active VLAN.
    fn sync_address_lists(
        &self,
        state: &mut IntfcState,
        uc: &[MacAddr],
        mc: &[MacAddr],
    ) -> Result<(), SyncError> {
        for addr in uc {
            if !addr.is_valid_unicast() {
                return Err(SyncError::InvalidAddress(*addr));
            }

            if !state.uc_synced.contains(addr) {
                self.queue_mac_all_vlans(state, *addr, true)?;
            }
        }

        for addr in state.uc_synced.clone() {
            if !uc.contains(&addr) {
                self.queue_mac_all_vlans(state, addr, false)?;
            }
        }

        for addr in mc {
            if !addr.is_multicast() {
                return Err(SyncError::InvalidAddress(*addr));
            }

            if !state.mc_synced.contains(addr) {
                self.queue_mac_all_vlans(state, *addr, true)?;
            }
        }

        for addr in state.mc_synced.clone() {
            if !mc.contains(&addr) {
                self.queue_mac_all_vlans(state, addr, false)?;
            }
        }

        state.uc_synced = uc.to_vec();
        state.mc_synced = mc.to_vec();
        Ok(())
    }

    /// Reception-mode change from the stack. `uc` and `mc` are the
    /// stack's current address lists for this interface.
    pub fn set_rx_mode(
        &self,
        flags: IfFlags,
        uc: &[MacAddr],
        mc: &[MacAddr],
    ) -> Result<(), SyncError> {
        let mut state = self.data.lock();
        state.flags = flags;

        // No need to update the hardware if we are not running; the
        // recorded flags keep set_mac honest about the down state.
        if !flags.contains(IfFlags::UP) {
            return Ok(());
        }

        let mode = xcast_mode_from_flags(flags);

        // Update the xcast mode first, but only if it changed.
        if state.xcast_mode != mode {
            // VLAN table fixups for promiscuous transitions, except
            // under IES tagging where filtering is bypassed anyway.
            if !self.cfg.ies {
                if mode == XcastMode::Promisc {
                    self.queue.queue_vlan_request(VlanRange::ALL, 0, true)?;
                }

                if state.xcast_mode == XcastMode::Promisc {
                    self.clear_unused_vlans(&state)?;
                }
            }

            // Push the mode if the host's mailbox is ready. The mode
            // is recorded below either way; if this push was
            // skipped, the device stays on the old mode until
            // restore_host_state re-asserts it.
            if self.host_mbx_ready() {
                if let Err(e) =
                    self.hw.update_xcast_mode(self.glort.base, mode)
                {
                    err!(
                        "failed to set xcast mode {} on {}: {:?}",
                        mode,
                        self.glort.base,
                        e
                    );
                }
            }

            state.xcast_mode = mode;
        }

        self.sync_address_lists(&mut state, uc, mc)
    }

    /// Change the interface's own station address. On a running
    /// interface the new address is synced under every active VLAN
    /// before the old one is dropped; on failure the old address
    /// stays in place.
    pub fn set_mac(&self, addr: MacAddr) -> Result<(), SyncError> {
        if !addr.is_valid_unicast() {
            return Err(SyncError::InvalidAddress(addr));
        }

        let mut state = self.data.lock();

        if state.flags.contains(IfFlags::UP) {
            self.queue_mac_all_vlans(&state, addr, true)?;
            let old = state.addr;
            self.queue_mac_all_vlans(&state, old, false)?;
        }

        state.addr = addr;
        Ok(())
    }

    fn configure_dglort(&self, shared_bits: u8) {
        let cfg = DglortConfig {
            glort: self.glort.base,
            rss_bits: fls(self.cfg.rss_mask),
            pc_bits: fls(self.cfg.qos_mask),
            shared_bits,
            inner_rss: true,
        };

        if let Err(e) = self.hw.configure_dglort_map(&cfg) {
            err!("failed to configure DGLORT map on {}: {:?}", cfg.glort, e);
        }
    }

    /// Offload a secondary interface onto its own logical port.
    /// Returns the port frames for the station will be tagged with.
    pub fn add_station(
        &self,
        id: StationId,
        addr: MacAddr,
    ) -> Result<Glort, SyncError> {
        let state = self.data.lock();
        let snap = self.l2.load();

        let (next, slot) = match snap.value.as_ref() {
            None => {
                // Standing up a table requires enough free logical
                // ports to fill it.
                if usize::from(self.glort.count) < L2_ACCEL_INIT_SIZE {
                    return Err(SyncError::CapacityExceeded(u64::from(
                        self.glort.count,
                    )));
                }

                L2AccelTable::new(self.glort.base)
                    .adding(Station { id, addr })?
            }
            Some(table) => {
                let count = table.count();

                // Never consume the interface's own port: the last
                // usable station port is base + count - 1.
                if count == MAX_STATIONS
                    || count == usize::from(self.glort.count) - 1
                {
                    return Err(SyncError::CapacityExceeded(count as u64));
                }

                table.adding(Station { id, addr })?
            }
        };

        let glort = next.glort_for_slot(slot);
        let shared_bits = fls(next.size() as u16);

        // Publish the complete replacement table; in-flight readers
        // keep their snapshot until they re-load.
        self.l2.store(Some(next));

        // Point the shared DGLORT decode at the RSS/QoS queues.
        self.configure_dglort(shared_bits);

        if self.host_mbx_ready() {
            if let Err(e) = self.hw.update_xcast_mode(glort, XcastMode::Multi)
            {
                err!("failed to set xcast mode on {}: {:?}", glort, e);
            }

            self.queue.queue_mac_request(
                glort,
                addr,
                self.cfg.default_vid,
                true,
            )?;
        }

        drop(state);
        Ok(glort)
    }

    /// Remove an offloaded station. A no-op if the station is not in
    /// the table.
    pub fn remove_station(&self, id: StationId) -> Result<(), SyncError> {
        let state = self.data.lock();
        let snap = self.l2.load();

        let Some(table) = snap.value.as_ref() else {
            return Ok(());
        };

        let Some((next, slot)) = table.removing(id) else {
            return Ok(());
        };

        let glort = table.glort_for_slot(slot);
        let addr = table
            .station_for_glort(glort)
            .map(|st| st.addr)
            .unwrap_or(MacAddr::ZERO);

        if self.host_mbx_ready() {
            if let Err(e) = self.hw.update_xcast_mode(glort, XcastMode::None)
            {
                err!("failed to clear xcast mode on {}: {:?}", glort, e);
            }

            self.queue.queue_mac_request(
                glort,
                addr,
                self.cfg.default_vid,
                false,
            )?;
        }

        let shared_bits = fls(next.size() as u16);

        if next.count() == 0 {
            // Last station gone: retire the whole table. Readers
            // holding the old snapshot drain off on their own.
            self.l2.store(None);
        } else {
            self.l2.store(Some(next));
        }

        self.configure_dglort(shared_bits);

        drop(state);
        Ok(())
    }

    /// Rebuild the full host state from scratch after a reset:
    /// logical port, VLAN table, our address under each VLAN, xcast
    /// mode, the synced address lists, and every offloaded station.
    /// Idempotent; running it twice installs the same state.
    pub fn restore_host_state(&self) -> Result<(), SyncError> {
        let mut state = self.data.lock();
        let mode = xcast_mode_from_flags(state.flags);

        if self.host_mbx_ready() {
            if let Err(e) = self.hw.update_lport_state(
                self.glort.base,
                self.glort.count,
                true,
            ) {
                err!("failed to enable lport {}: {:?}", self.glort.base, e);
            }
        }

        if mode == XcastMode::Promisc || self.cfg.ies {
            self.queue.queue_vlan_request(VlanRange::ALL, 0, true)?;
        } else {
            self.queue.queue_vlan_request(VlanRange::ALL, 0, false)?;
        }

        // Replay the active VLANs with our station address under
        // each.
        let addr = state.addr;
        let mut vid = self.next_active_vlan(&state, 0);

        while vid < VLAN_N_VID {
            self.queue.queue_vlan_request(VlanRange::one(vid), 0, true)?;
            self.queue.queue_mac_request(self.glort.base, addr, vid, true)?;
            vid = self.next_active_vlan(&state, vid);
        }

        if self.host_mbx_ready() {
            if let Err(e) = self.hw.update_xcast_mode(self.glort.base, mode)
            {
                err!(
                    "failed to set xcast mode {} on {}: {:?}",
                    mode,
                    self.glort.base,
                    e
                );
            }
        }

        // Re-assert every synced address.
        for addr in state.uc_synced.clone() {
            self.queue_mac_all_vlans(&state, addr, true)?;
        }
        for addr in state.mc_synced.clone() {
            self.queue_mac_all_vlans(&state, addr, true)?;
        }

        // Replay forwarding-acceleration stations.
        if let Some(table) = self.l2.load().value.as_ref() {
            for (glort, station) in table.stations() {
                if let Err(e) =
                    self.hw.update_xcast_mode(glort, XcastMode::Multi)
                {
                    err!("failed to set xcast mode on {}: {:?}", glort, e);
                }

                self.queue.queue_mac_request(
                    glort,
                    station.addr,
                    self.cfg.default_vid,
                    true,
                )?;
            }
        }

        state.xcast_mode = mode;
        Ok(())
    }

    /// Quiesce before a reset: wait out any in-flight drain, cancel
    /// everything still queued for this port, and drop the logical
    /// port. Tolerates a mailbox that never becomes ready.
    pub fn reset_host_state(&self) {
        // Wait for MAC/VLAN work to finish before cancelling; a
        // cancel must not race a drain in flight.
        self.queue.wait_idle();
        self.queue.clear_queued(self.glort.base, true);

        let mut state = self.data.lock();

        if self.host_mbx_ready() {
            if let Err(e) = self.hw.update_lport_state(
                self.glort.base,
                self.glort.count,
                false,
            ) {
                err!("failed to disable lport {}: {:?}", self.glort.base, e);
            }
        }

        // The synced address lists are left intact: they are the
        // record of what the next restore must re-assert.
        state.xcast_mode = XcastMode::None;
    }
}
