// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! API types shared between the host interface sync engine and its
//! administrative consumers.

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

pub mod cmd;
pub mod glort;
pub mod mac;
pub mod vlan;
pub mod xcast;

pub use cmd::*;
pub use glort::*;
pub use mac::*;
pub use vlan::*;
pub use xcast::*;

/// The overall version of the API. Anytime an API is added, removed,
/// or modified, this number should increment. Currently we attach no
/// semantic meaning to the number other than as a means to verify
/// that both sides of the management channel are compiled for the
/// same API.
pub const API_VERSION: u64 = 2;
