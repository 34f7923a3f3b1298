// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker session.
//!
//! The hub keeps one persistent connection to the broker, subscribes to a
//! single command topic and hands every message on it to the
//! [`CommandDispatcher`](crate::command::CommandDispatcher).
//!
//! # Session States
//!
//! ```text
//! Disconnected --health check--> Connecting --CONNACK--> Subscribed
//!      ^                             |                       |
//!      +------- connect error -------+------- drop ----------+
//! ```
//!
//! Reconnection is never immediate: a dropped session waits for the next
//! tick of the reconnect health check before connecting again.

mod session;

pub use session::{BrokerSession, SessionState};
