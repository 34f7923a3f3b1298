// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The live list of known bulbs.
//!
//! The roster is the only state shared between the scan loop and the broker
//! session. It holds an immutable snapshot behind a lock that is taken only
//! to swap or clone the snapshot pointer, so readers always see a complete
//! scan result and a scan never blocks command handling.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::Device;

/// The devices found by the most recently completed scan.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use yeehub::DeviceRoster;
/// use yeehub::types::Device;
///
/// let roster = DeviceRoster::new();
/// assert!(roster.current().is_empty());
///
/// roster.replace(vec![Device::new("yeelink-bulb-01", Ipv4Addr::new(192, 168, 1, 10))]);
/// assert_eq!(roster.current().len(), 1);
/// ```
#[derive(Debug)]
pub struct DeviceRoster {
    devices: RwLock<Arc<[Device]>>,
}

impl DeviceRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Swaps in the result of a completed scan.
    ///
    /// The previous snapshot is dropped once its last reader releases it.
    pub fn replace(&self, devices: Vec<Device>) {
        let snapshot: Arc<[Device]> = Arc::from(devices);
        *self.devices.write() = snapshot;
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<[Device]> {
        Arc::clone(&self.devices.read())
    }
}

impl Default for DeviceRoster {
    fn default() -> Self {
        Self::new()
    }
}
