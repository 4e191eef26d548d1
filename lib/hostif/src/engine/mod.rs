// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The address/VLAN synchronization engine.
//!
//! All code under this namespace is guarded by the `engine` feature
//! flag.

pub mod glort;
pub mod interface;
pub mod l2accel;
pub mod queue;

use hostif_api::DglortConfig;
use hostif_api::Glort;
use hostif_api::RequestKind;
use hostif_api::SyncError;
use hostif_api::XcastMode;

cfg_if! {
    if #[cfg(feature = "std")] {
        #[macro_export]
        macro_rules! dbg_macro {
            ($s:tt) => {
                println!($s);
            };
            ($s:tt, $($arg:tt)*) => {
                println!($s, $($arg)*);
            };
        }

        #[macro_export]
        macro_rules! err_macro {
            ($s:tt) => {
                println!(concat!("ERROR: ", $s));
            };
            ($s:tt, $($arg:tt)*) => {
                println!(concat!("ERROR: ", $s), $($arg)*);
            };
        }
    } else {
        // The kernel build routes these to the native log sink.
        #[macro_export]
        macro_rules! dbg_macro {
            ($s:tt) => {};
            ($s:tt, $($arg:tt)*) => {};
        }

        #[macro_export]
        macro_rules! err_macro {
            ($s:tt) => {};
            ($s:tt, $($arg:tt)*) => {};
        }
    }
}

pub use dbg_macro as dbg;
pub use err_macro as err;

/// The management channel carrying queued requests to the switch
/// manager.
///
/// Readiness is re-checked per drain attempt, never cached: the
/// channel may come and go across resets independently of the state
/// queued behind it.
pub trait Mailbox {
    fn is_ready(&self) -> bool;

    /// Hand one encoded request to the channel. `TransportBusy` and
    /// `TransportDown` are the expected failure modes.
    fn send(&self, kind: RequestKind, payload: &[u8]) -> Result<(), SyncError>;
}

/// Hardware port-state operations, backed by the MAC layer beneath
/// the engine.
///
/// All fallible; failures are logged by the caller and not retried
/// here. The next resync cycle re-asserts the intended state.
pub trait HostHw {
    /// Enable or disable the `count` logical ports starting at
    /// `glort`.
    fn update_lport_state(
        &self,
        glort: Glort,
        count: u16,
        enable: bool,
    ) -> Result<(), SyncError>;

    fn update_xcast_mode(
        &self,
        glort: Glort,
        mode: XcastMode,
    ) -> Result<(), SyncError>;

    fn configure_dglort_map(&self, cfg: &DglortConfig) -> Result<(), SyncError>;
}
