// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `yeehub` - discovers Yeelight bulbs on the local network and toggles them
//! on MQTT command.
//!
//! The hub runs two long-lived tasks:
//!
//! - **Scan loop**: sweeps the local `/24` subnet by reverse DNS at a fixed
//!   interval and publishes every bulb whose hostname carries the vendor
//!   signature into the [`DeviceRoster`]
//! - **Broker session**: keeps one MQTT connection subscribed to a command
//!   topic and toggles bulbs for every message received
//!
//! # Command Payloads
//!
//! An empty message toggles every bulb in the roster. A JSON list of device
//! descriptors toggles exactly those bulbs:
//!
//! ```json
//! [{"hostname": "yeelink-bulb-01", "ip": "192.168.1.10"}]
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use yeehub::{DefaultHub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> yeehub::Result<()> {
//!     let config = HubConfig::load("hub_config")?;
//!     let hub = DefaultHub::from_config(&config)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     hub.run(shutdown_rx).await;
//!     Ok(())
//! }
//! ```

pub mod bulb;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
mod hub;
pub mod protocol;
mod roster;
mod scan_loop;
pub mod types;

pub use config::{BrokerConfig, HubConfig, ScanConfig};
pub use error::{
    BulbError, ConfigError, Error, LookupError, PayloadError, ProtocolError, Result, ScanError,
    ValueError,
};
pub use hub::{DefaultHub, Hub};
pub use roster::DeviceRoster;
pub use scan_loop::{CycleOutcome, ScanLoop};
pub use types::{Device, Subnet};
