// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `/24` network swept by a scan.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::ValueError;

/// A flat `/24` network identified by its first three octets.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use yeehub::types::Subnet;
///
/// let subnet: Subnet = "192.168.1".parse().unwrap();
/// assert_eq!(subnet.host(10), Ipv4Addr::new(192, 168, 1, 10));
/// assert_eq!(subnet.to_string(), "192.168.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    prefix: [u8; 3],
}

impl Subnet {
    /// Creates a subnet from its three leading octets.
    #[must_use]
    pub const fn new(a: u8, b: u8, c: u8) -> Self {
        Self { prefix: [a, b, c] }
    }

    /// Returns the address of `host` within this subnet.
    #[must_use]
    pub const fn host(&self, host: u8) -> Ipv4Addr {
        Ipv4Addr::new(self.prefix[0], self.prefix[1], self.prefix[2], host)
    }

    /// Returns the subnet of `address` if it lies in `192.168.0.0/16`.
    #[must_use]
    pub fn of_private_address(address: Ipv4Addr) -> Option<Self> {
        match address.octets() {
            [192, 168, c, _] => Some(Self::new(192, 168, c)),
            _ => None,
        }
    }

    /// Picks the subnet of the first `192.168.x.y` address in `addresses`.
    ///
    /// Order matters: when several addresses qualify, the first one wins.
    pub fn first_private(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Option<Self> {
        addresses.into_iter().find_map(Self::of_private_address)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.prefix;
        write!(f, "{a}.{b}.{c}")
    }
}

impl FromStr for Subnet {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = s.trim().split('.').map(str::parse::<u8>);
        match (octets.next(), octets.next(), octets.next(), octets.next()) {
            (Some(Ok(a)), Some(Ok(b)), Some(Ok(c)), None) => Ok(Self::new(a, b, c)),
            _ => Err(ValueError::InvalidSubnet(s.to_string())),
        }
    }
}
