// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound toggle commands and their dispatch to bulbs.
//!
//! # Payload Contract
//!
//! | Payload | Effect |
//! |---------|--------|
//! | empty or whitespace | toggle every bulb in the roster |
//! | `[{"hostname": "...", "ip": "192.168.1.10"}, ...]` | toggle exactly those bulbs |
//! | anything else | logged, then treated as empty |
//!
//! # Examples
//!
//! ```
//! use yeehub::command::CommandPayload;
//!
//! assert_eq!(CommandPayload::decode(b"").unwrap(), CommandPayload::Roster);
//!
//! let payload = CommandPayload::decode(br#"[{"hostname": "yeelink-bulb-01", "ip": "192.168.1.10"}]"#)
//!     .unwrap();
//! assert!(matches!(payload, CommandPayload::Devices(ref devices) if devices.len() == 1));
//! ```

mod dispatcher;
mod payload;

pub use dispatcher::{CommandDispatcher, DispatchReport};
pub use payload::CommandPayload;
