// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by discovery and control.
//!
//! # Types
//!
//! - [`Device`] - A discovered bulb: its resolved name and IPv4 address
//! - [`Subnet`] - The `/24` network swept by a scan cycle

mod device;
mod subnet;

pub use device::Device;
pub use subnet::Subnet;
