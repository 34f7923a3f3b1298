// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subnet discovery of bulbs by reverse DNS.
//!
//! A scan cycle sweeps every host address of one `/24` network:
//!
//! 1. The [`SubnetSource`] names the network (a local interface in
//!    `192.168.0.0/16`, or a fixed prefix from configuration)
//! 2. The [`ScanCoordinator`] splits the 256 addresses into contiguous
//!    ranges, one per worker
//! 3. Each worker runs the [`SubnetProber`] over its range, one address at a
//!    time, keeping the addresses whose hostname carries the vendor signature
//! 4. The per-worker results are concatenated in range order
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use yeehub::discovery::{LocalInterfaces, ScanCoordinator, SubnetProber, SystemResolver};
//!
//! # async fn example() -> Result<(), yeehub::error::ScanError> {
//! let prober = SubnetProber::new(SystemResolver::new(Duration::from_secs(1)), "yeelink");
//! let coordinator = ScanCoordinator::new(prober, LocalInterfaces, 16);
//!
//! for device in coordinator.scan().await? {
//!     println!("{device}");
//! }
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod prober;
mod source;

pub use coordinator::{ScanCoordinator, partition};
pub use prober::{HostResolver, SubnetProber, SystemResolver};
pub use source::{LocalInterfaces, SubnetChoice, SubnetSource};
