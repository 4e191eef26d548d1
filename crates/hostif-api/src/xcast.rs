// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The interface's multicast/broadcast/promiscuous reception policy
/// as seen by the switch.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, Hash,
)]
pub enum XcastMode {
    /// Unicast to the station address only.
    #[default]
    None,
    /// Subscribed multicast plus broadcast.
    Multi,
    /// All multicast plus broadcast.
    AllMulti,
    /// Everything reaching the logical port.
    Promisc,
}

impl Display for XcastMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Multi => "multi",
            Self::AllMulti => "allmulti",
            Self::Promisc => "promisc",
        };

        write!(f, "{}", s)
    }
}
