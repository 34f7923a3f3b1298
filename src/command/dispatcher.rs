// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sequential, failure-isolated dispatch of commands to bulbs.

use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::bulb::BulbControl;
use crate::error::BulbError;
use crate::roster::DeviceRoster;
use crate::types::Device;

use super::payload::CommandPayload;

/// Per-device tally of a dispatched command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Devices that acknowledged the command.
    pub succeeded: usize,
    /// Devices that failed or could not be reached.
    pub failed: usize,
}

impl DispatchReport {
    /// Returns the number of devices a command was attempted on.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Drives bulbs in response to toggle commands.
///
/// Devices are handled one after another in roster order. A failing device
/// is logged and skipped; it never stops the remaining devices.
#[derive(Debug)]
pub struct CommandDispatcher<B> {
    roster: Arc<DeviceRoster>,
    bulbs: B,
}

impl<B: BulbControl> CommandDispatcher<B> {
    /// Creates a dispatcher reading targets from `roster`.
    #[must_use]
    pub fn new(roster: Arc<DeviceRoster>, bulbs: B) -> Self {
        Self { roster, bulbs }
    }

    /// Returns the roster this dispatcher reads from.
    #[must_use]
    pub fn roster(&self) -> &Arc<DeviceRoster> {
        &self.roster
    }

    /// Returns the bulb client.
    #[must_use]
    pub fn bulbs(&self) -> &B {
        &self.bulbs
    }

    /// Decodes a raw MQTT payload and toggles the devices it names.
    ///
    /// A payload that cannot be decoded is logged and treated as empty, so
    /// the whole roster is toggled.
    pub async fn handle_payload(&self, payload: &[u8]) -> DispatchReport {
        let command = CommandPayload::decode(payload).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Unrecognized command payload, toggling roster"
            );
            CommandPayload::Roster
        });

        self.handle_toggle_command(command.targets()).await
    }

    /// Toggles `targets`, or every device in the roster when `None`.
    pub async fn handle_toggle_command(&self, targets: Option<&[Device]>) -> DispatchReport {
        let snapshot;
        let devices = match targets {
            Some(devices) => devices,
            None => {
                snapshot = self.roster.current();
                &snapshot[..]
            }
        };

        tracing::info!(count = devices.len(), "Toggling bulbs");
        let report = self
            .for_each_device(devices, "toggle", |address| self.bulbs.toggle(address))
            .await;
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "All bulbs toggled"
        );
        report
    }

    /// Turns off every device in the roster.
    ///
    /// Used once at startup to put all bulbs into a known state.
    pub async fn turn_off_all(&self) -> DispatchReport {
        let devices = self.roster.current();

        tracing::info!(count = devices.len(), "Turning off all bulbs");
        let report = self
            .for_each_device(&devices, "turn off", |address| self.bulbs.turn_off(address))
            .await;
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "All bulbs turned off"
        );
        report
    }

    async fn for_each_device<F, Fut>(
        &self,
        devices: &[Device],
        action: &'static str,
        command: F,
    ) -> DispatchReport
    where
        F: Fn(Ipv4Addr) -> Fut,
        Fut: Future<Output = Result<(), BulbError>>,
    {
        let mut report = DispatchReport::default();
        for device in devices {
            match command(device.address()).await {
                Ok(()) => {
                    tracing::info!(
                        hostname = %device.identifier(),
                        address = %device.address(),
                        "Bulb {action} succeeded"
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    tracing::error!(
                        hostname = %device.identifier(),
                        address = %device.address(),
                        error = %e,
                        "Bulb {action} failed"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulb::testing::{Call, RecordingBulbs};

    fn bulb(host: u8) -> Device {
        Device::new(format!("yeelink-bulb-{host:02}"), Ipv4Addr::new(192, 168, 1, host))
    }

    fn dispatcher(roster: Vec<Device>, bulbs: RecordingBulbs) -> CommandDispatcher<RecordingBulbs> {
        let shared = Arc::new(DeviceRoster::new());
        shared.replace(roster);
        CommandDispatcher::new(shared, bulbs)
    }

    #[tokio::test]
    async fn explicit_targets_bypass_roster() {
        let dispatcher = dispatcher(vec![bulb(1), bulb(2)], RecordingBulbs::default());
        let targets = [bulb(50)];

        let report = dispatcher.handle_toggle_command(Some(&targets)).await;

        assert_eq!(report, DispatchReport { succeeded: 1, failed: 0 });
        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![Call::Toggle(Ipv4Addr::new(192, 168, 1, 50))]
        );
    }

    #[tokio::test]
    async fn no_targets_uses_roster_in_order() {
        let dispatcher = dispatcher(vec![bulb(12), bulb(10)], RecordingBulbs::default());

        dispatcher.handle_toggle_command(None).await;

        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 12)),
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 10)),
            ]
        );
    }

    #[tokio::test]
    async fn failing_device_does_not_stop_the_rest() {
        let targets: Vec<Device> = (1..=5).map(bulb).collect();
        let bulbs = RecordingBulbs::failing([Ipv4Addr::new(192, 168, 1, 3)]);
        let dispatcher = dispatcher(Vec::new(), bulbs);

        let report = dispatcher.handle_toggle_command(Some(&targets)).await;

        assert_eq!(report, DispatchReport { succeeded: 4, failed: 1 });
        let toggled: Vec<Call> = targets
            .iter()
            .map(|d| Call::Toggle(d.address()))
            .collect();
        assert_eq!(dispatcher.bulbs().calls(), toggled);
    }

    #[tokio::test]
    async fn turn_off_all_isolates_failures() {
        let bulbs = RecordingBulbs::failing([Ipv4Addr::new(192, 168, 1, 1)]);
        let dispatcher = dispatcher(vec![bulb(1), bulb(2)], bulbs);

        let report = dispatcher.turn_off_all().await;

        assert_eq!(report, DispatchReport { succeeded: 1, failed: 1 });
        assert_eq!(report.attempted(), 2);
        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![
                Call::TurnOff(Ipv4Addr::new(192, 168, 1, 1)),
                Call::TurnOff(Ipv4Addr::new(192, 168, 1, 2)),
            ]
        );
    }

    #[tokio::test]
    async fn empty_roster_is_a_no_op() {
        let dispatcher = dispatcher(Vec::new(), RecordingBulbs::default());
        assert_eq!(dispatcher.handle_toggle_command(None).await.attempted(), 0);
        assert_eq!(dispatcher.turn_off_all().await.attempted(), 0);
        assert!(dispatcher.bulbs().calls().is_empty());
    }

    #[tokio::test]
    async fn payload_list_targets_listed_devices() {
        let dispatcher = dispatcher(vec![bulb(1)], RecordingBulbs::default());

        dispatcher
            .handle_payload(br#"[{"hostname": "yeelink-bulb-07", "ip": "192.168.1.7"}]"#)
            .await;

        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![Call::Toggle(Ipv4Addr::new(192, 168, 1, 7))]
        );
    }

    #[tokio::test]
    async fn empty_or_garbage_payload_toggles_roster() {
        let dispatcher = dispatcher(vec![bulb(1)], RecordingBulbs::default());

        dispatcher.handle_payload(b"").await;
        dispatcher.handle_payload(b"toggle please").await;

        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 1)),
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 1)),
            ]
        );
    }

    #[tokio::test]
    async fn roster_snapshot_taken_per_command() {
        let dispatcher = dispatcher(vec![bulb(1)], RecordingBulbs::default());
        dispatcher.handle_toggle_command(None).await;

        dispatcher.roster().replace(vec![bulb(2)]);
        dispatcher.handle_toggle_command(None).await;

        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 1)),
                Call::Toggle(Ipv4Addr::new(192, 168, 1, 2)),
            ]
        );
    }
}
