// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concurrent sweep of a `/24` subnet.

use std::ops::Range;
use std::sync::Arc;

use crate::config::MAX_WORKERS;
use crate::error::ScanError;
use crate::types::{Device, Subnet};

use super::prober::{HostResolver, SubnetProber};
use super::source::SubnetSource;

/// Number of host addresses in a `/24`.
const HOSTS_PER_SUBNET: u16 = 256;

/// Splits the host numbers `0..256` into `worker_count` contiguous ranges.
///
/// The ranges are as even as possible: the first `256 % n` ranges get one
/// extra address. `worker_count` is clamped into `1..=256`, so every host
/// number appears in exactly one range.
///
/// # Examples
///
/// ```
/// use yeehub::discovery::partition;
///
/// let ranges = partition(3);
/// assert_eq!(ranges, vec![0..86, 86..171, 171..256]);
/// ```
#[must_use]
pub fn partition(worker_count: usize) -> Vec<Range<u16>> {
    let workers = u16::try_from(worker_count.clamp(1, MAX_WORKERS)).unwrap_or(HOSTS_PER_SUBNET);
    let base = HOSTS_PER_SUBNET / workers;
    let remainder = HOSTS_PER_SUBNET % workers;

    let mut ranges = Vec::with_capacity(usize::from(workers));
    let mut start = 0;
    for index in 0..workers {
        let len = base + u16::from(index < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Sweeps every host address of a subnet with a fixed pool of workers.
///
/// Each worker probes its range sequentially and keeps its matches in a
/// local list; the lists are concatenated in range order once every worker
/// has finished, so the result is ordered by address.
#[derive(Debug)]
pub struct ScanCoordinator<R, S> {
    prober: Arc<SubnetProber<R>>,
    source: S,
    worker_count: usize,
}

impl<R: HostResolver, S: SubnetSource> ScanCoordinator<R, S> {
    /// Creates a coordinator running `worker_count` probe workers per cycle.
    #[must_use]
    pub fn new(prober: SubnetProber<R>, source: S, worker_count: usize) -> Self {
        Self {
            prober: Arc::new(prober),
            source,
            worker_count: worker_count.clamp(1, MAX_WORKERS),
        }
    }

    /// Returns the number of workers per cycle.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs one complete scan cycle.
    ///
    /// Returns only after every address of the subnet has been probed once.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SubnetUnavailable`] without probing anything if
    /// the subnet cannot be determined, and [`ScanError::WorkerFailed`] if a
    /// worker panicked.
    pub async fn scan(&self) -> Result<Vec<Device>, ScanError> {
        tracing::info!("Scanning network for bulbs");

        let Some(subnet) = self.source.subnet() else {
            tracing::error!("No router connection, aborting scan");
            return Err(ScanError::SubnetUnavailable);
        };

        tracing::debug!(subnet = %subnet, workers = self.worker_count, "Starting subnet sweep");

        let devices = self.sweep(subnet).await?;

        if devices.is_empty() {
            tracing::warn!(subnet = %subnet, "Network scan ended, no bulbs found");
        } else {
            let summary: Vec<String> = devices.iter().map(ToString::to_string).collect();
            tracing::info!(
                subnet = %subnet,
                count = devices.len(),
                bulbs = %summary.join(", "),
                "Network scan ended"
            );
        }

        Ok(devices)
    }

    async fn sweep(&self, subnet: Subnet) -> Result<Vec<Device>, ScanError> {
        let workers: Vec<_> = partition(self.worker_count)
            .into_iter()
            .map(|range| {
                let prober = Arc::clone(&self.prober);
                tokio::spawn(async move {
                    let mut found = Vec::new();
                    for host in range.filter_map(|h| u8::try_from(h).ok()) {
                        if let Some(device) = prober.probe(subnet.host(host)).await {
                            found.push(device);
                        }
                    }
                    found
                })
            })
            .collect();

        // Join every worker before reporting a failure so no range is left
        // running behind the caller.
        let mut devices = Vec::new();
        let mut failure = None;
        for worker in workers {
            match worker.await {
                Ok(found) => devices.extend(found),
                Err(e) => {
                    tracing::error!(error = %e, "Probe worker failed");
                    failure.get_or_insert_with(|| ScanError::WorkerFailed(e.to_string()));
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(devices),
        }
    }
}
