// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic rescanning of the subnet.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::discovery::{HostResolver, ScanCoordinator, SubnetSource};
use crate::error::ScanError;
use crate::roster::DeviceRoster;

/// Result of a single scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The roster was replaced with this many devices.
    Updated(usize),
    /// No subnet could be determined; the roster was left untouched.
    Aborted,
    /// The cycle failed unexpectedly; the roster was left untouched.
    Failed,
}

/// Keeps the roster current by running a scan cycle every interval.
#[derive(Debug)]
pub struct ScanLoop<R, S> {
    coordinator: Arc<ScanCoordinator<R, S>>,
    roster: Arc<DeviceRoster>,
    interval: Duration,
    backoff: Duration,
}

impl<R: HostResolver, S: SubnetSource> ScanLoop<R, S> {
    /// Creates a loop publishing the results of `coordinator` into `roster`.
    #[must_use]
    pub fn new(
        coordinator: Arc<ScanCoordinator<R, S>>,
        roster: Arc<DeviceRoster>,
        interval: Duration,
        backoff: Duration,
    ) -> Self {
        Self {
            coordinator,
            roster,
            interval,
            backoff,
        }
    }

    /// Returns the pause between two successful cycles.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the pause after a failed cycle.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs one scan cycle and publishes its result.
    ///
    /// The cycle runs on its own task so that a panic anywhere inside it is
    /// contained and reported as [`CycleOutcome::Failed`].
    pub async fn run_cycle(&self) -> CycleOutcome {
        let coordinator = Arc::clone(&self.coordinator);
        let cycle = tokio::spawn(async move { coordinator.scan().await });

        match cycle.await {
            Ok(Ok(devices)) => {
                let count = devices.len();
                self.roster.replace(devices);
                CycleOutcome::Updated(count)
            }
            Ok(Err(ScanError::SubnetUnavailable)) => {
                tracing::warn!("Scan aborted, keeping previous roster");
                CycleOutcome::Aborted
            }
            Ok(Err(e)) => {
                tracing::error!(critical = true, error = %e, "Scan cycle failed");
                CycleOutcome::Failed
            }
            Err(e) => {
                tracing::error!(critical = true, error = %e, "Scan cycle panicked");
                CycleOutcome::Failed
            }
        }
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first cycle starts after one pause; callers usually run an initial
    /// cycle themselves before handing the loop to a task.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut pause = self.interval;

        loop {
            tokio::select! {
                () = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            pause = match self.run_cycle().await {
                CycleOutcome::Failed => self.backoff,
                CycleOutcome::Updated(_) | CycleOutcome::Aborted => self.interval,
            };
        }

        tracing::info!("Scan loop stopped");
    }
}
