// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use super::glort::Glort;
use super::mac::MacAddr;
use super::vlan::VlanRange;
use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;
use serde::Deserialize;
use serde::Serialize;

/// Errors surfaced by the sync engine.
///
/// `ResourceExhausted` and `TransportBusy` are recoverable: the
/// system is level-triggered, so the next triggering event or full
/// resync re-asserts the state rather than retrying immediately.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SyncError {
    /// The forwarding table is at its station or logical-port limit.
    CapacityExceeded(u64),
    DeserRequest(String),
    InvalidAddress(MacAddr),
    /// VLAN programming is blocked by the hardware override policy.
    PolicyDenied,
    ResourceExhausted,
    SerRequest(String),
    TransportBusy,
    TransportDown,
    VlanOutOfRange(u16),
}

/// The message class a queued request is sent under. The switch
/// manager routes unicast and multicast table updates differently.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RequestKind {
    UnicastMac,
    MulticastMac,
    Vlan,
}

/// A MAC table update for one `(glort, addr, vid)` triple.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MacRequest {
    pub glort: Glort,
    pub addr: MacAddr,
    pub vid: u16,
    pub set: bool,
}

/// A VLAN table update covering a range of VLAN IDs.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VlanRequest {
    pub range: VlanRange,
    /// VSI index, used by the VF message format. Always 0 from the
    /// PF side.
    pub vsi: u8,
    pub set: bool,
}

/// A pending address/VLAN update destined for the switch manager.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MacVlanRequest {
    Mac(MacRequest),
    Vlan(VlanRequest),
}

impl MacVlanRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Mac(mac) if mac.addr.is_multicast() => {
                RequestKind::MulticastMac
            }
            Self::Mac(_) => RequestKind::UnicastMac,
            Self::Vlan(_) => RequestKind::Vlan,
        }
    }

    /// The GLORT this request targets, if it targets one. VLAN
    /// requests apply to the whole interface.
    pub fn glort(&self) -> Option<Glort> {
        match self {
            Self::Mac(mac) => Some(mac.glort),
            Self::Vlan(_) => None,
        }
    }

    /// Serialize into the payload bytes handed to the management
    /// channel.
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        postcard::to_allocvec(self)
            .map_err(|e| SyncError::SerRequest(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        postcard::from_bytes(bytes)
            .map_err(|e| SyncError::DeserRequest(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_from_address() {
        let uc = MacVlanRequest::Mac(MacRequest {
            glort: Glort::new(0x40),
            addr: MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]),
            vid: 10,
            set: true,
        });
        assert_eq!(uc.kind(), RequestKind::UnicastMac);

        let mc = MacVlanRequest::Mac(MacRequest {
            glort: Glort::new(0x40),
            addr: MacAddr::from([0x01, 0x00, 0x5E, 0x00, 0x00, 0xFB]),
            vid: 10,
            set: true,
        });
        assert_eq!(mc.kind(), RequestKind::MulticastMac);

        let vlan = MacVlanRequest::Vlan(VlanRequest {
            range: VlanRange::one(10),
            vsi: 0,
            set: false,
        });
        assert_eq!(vlan.kind(), RequestKind::Vlan);
        assert_eq!(vlan.glort(), None);
    }

    #[test]
    fn payload_round_trip() {
        let reqs = [
            MacVlanRequest::Mac(MacRequest {
                glort: Glort::new(0x101),
                addr: MacAddr::BROADCAST,
                vid: 4094,
                set: false,
            }),
            MacVlanRequest::Vlan(VlanRequest {
                range: VlanRange::ALL,
                vsi: 0,
                set: true,
            }),
        ];

        for req in reqs {
            let bytes = req.encode().unwrap();
            assert_eq!(MacVlanRequest::decode(&bytes).unwrap(), req);
        }
    }

    #[test]
    fn decode_garbage() {
        assert!(matches!(
            MacVlanRequest::decode(&[0xFF, 0xFF, 0xFF]),
            Err(SyncError::DeserRequest(_))
        ));
    }
}
