// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A discovered bulb.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// A bulb found on the subnet.
///
/// Devices are plain values: a scan creates a fresh set of them each cycle
/// and nothing mutates them afterwards.
///
/// The serialized form uses the `hostname` / `ip` keys that command payloads
/// carry; `identifier` and `address` are accepted as aliases.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use yeehub::types::Device;
///
/// let device = Device::new("yeelink-light-color1_mibt1234", Ipv4Addr::new(192, 168, 1, 10));
/// assert_eq!(device.address(), Ipv4Addr::new(192, 168, 1, 10));
/// assert_eq!(device.to_string(), "yeelink-light-color1_mibt1234 at 192.168.1.10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "hostname", alias = "identifier")]
    identifier: String,
    #[serde(rename = "ip", alias = "address")]
    address: Ipv4Addr,
}

impl Device {
    /// Creates a device from its resolved name and address.
    #[must_use]
    pub fn new(identifier: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            identifier: identifier.into(),
            address,
        }
    }

    /// Returns the reverse-DNS hostname (or reported name) of the device.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the IPv4 address of the device.
    #[must_use]
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.identifier, self.address)
    }
}
