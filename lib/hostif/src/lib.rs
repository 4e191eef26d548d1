// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Control-plane synchronization engine for a multi-port switch host
//! interface.
//!
//! The engine keeps the switch manager's MAC, VLAN, and forwarding
//! tables consistent with host networking state: stack-level address
//! and VLAN events become queued requests drained asynchronously to
//! the management channel, while forwarding-acceleration stations are
//! mapped onto additional logical ports read lock-free by the receive
//! path.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "engine", test))]
#[macro_use]
extern crate alloc;

#[cfg(any(feature = "engine", test))]
#[macro_use]
extern crate cfg_if;

#[cfg(any(feature = "api", test))]
pub use hostif_api as api;

#[cfg(any(feature = "engine", test))]
pub mod ddi;
#[cfg(any(feature = "engine", test))]
pub mod dynamic;
#[cfg(any(feature = "engine", test))]
pub mod engine;
