// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Determination of the subnet to sweep.

use std::net::IpAddr;

use network_interface::{NetworkInterface, NetworkInterfaceConfig};

use crate::types::Subnet;

/// Something that can name the `/24` network a scan cycle should sweep.
///
/// Returning `None` aborts the cycle without probing.
pub trait SubnetSource: Send + Sync + 'static {
    /// Returns the subnet to sweep, or `None` if it cannot be determined.
    fn subnet(&self) -> Option<Subnet>;
}

/// A fixed subnet, e.g. from configuration.
impl SubnetSource for Subnet {
    fn subnet(&self) -> Option<Subnet> {
        Some(*self)
    }
}

/// Reads the subnet from the host's network interfaces.
///
/// The first IPv4 address in `192.168.0.0/16`, in interface enumeration
/// order, decides the subnet. Enumeration is repeated every cycle so a
/// change of network is picked up on the next scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInterfaces;

impl SubnetSource for LocalInterfaces {
    fn subnet(&self) -> Option<Subnet> {
        let interfaces = match NetworkInterface::show() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                tracing::error!(error = %e, "Failed to enumerate network interfaces");
                return None;
            }
        };

        let addresses = interfaces.iter().flat_map(|interface| {
            interface.addr.iter().filter_map(|addr| match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
        });

        let subnet = Subnet::first_private(addresses);
        tracing::debug!(subnet = ?subnet.map(|s| s.to_string()), "Local subnet lookup");
        subnet
    }
}

/// Subnet selection as configured: fixed prefix or local interfaces.
#[derive(Debug, Clone, Copy)]
pub enum SubnetChoice {
    /// Always sweep this subnet.
    Fixed(Subnet),
    /// Derive the subnet from local interfaces each cycle.
    Local(LocalInterfaces),
}

impl From<Option<Subnet>> for SubnetChoice {
    fn from(subnet: Option<Subnet>) -> Self {
        subnet.map_or(Self::Local(LocalInterfaces), Self::Fixed)
    }
}

impl SubnetSource for SubnetChoice {
    fn subnet(&self) -> Option<Subnet> {
        match self {
            Self::Fixed(subnet) => subnet.subnet(),
            Self::Local(local) => local.subnet(),
        }
    }
}
