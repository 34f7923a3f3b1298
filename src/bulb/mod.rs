// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bulb control.
//!
//! The hub only needs two operations from a bulb: toggle its power and turn
//! it off. [`BulbControl`] abstracts them so the dispatcher does not depend
//! on the wire protocol; [`YeelightClient`] implements them over the
//! Yeelight LAN control protocol.

mod yeelight;

pub use yeelight::{YEELIGHT_PORT, YeelightClient};

use std::future::Future;
use std::net::Ipv4Addr;

use crate::error::BulbError;

/// Power control for a bulb addressed by IPv4.
///
/// Any error is reported to the caller as a value; the dispatcher logs it
/// and moves on to the next bulb.
pub trait BulbControl: Send + Sync + 'static {
    /// Toggles the power of the bulb at `address`.
    ///
    /// # Errors
    ///
    /// Returns error if the bulb cannot be reached or rejects the command.
    fn toggle(&self, address: Ipv4Addr) -> impl Future<Output = Result<(), BulbError>> + Send;

    /// Turns off the bulb at `address`.
    ///
    /// # Errors
    ///
    /// Returns error if the bulb cannot be reached or rejects the command.
    fn turn_off(&self, address: Ipv4Addr) -> impl Future<Output = Result<(), BulbError>> + Send;
}
