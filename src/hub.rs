// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level wiring of the scan loop and the broker session.

use std::sync::Arc;

use tokio::sync::watch;

use crate::bulb::{BulbControl, YeelightClient};
use crate::command::CommandDispatcher;
use crate::config::HubConfig;
use crate::discovery::{
    HostResolver, ScanCoordinator, SubnetChoice, SubnetProber, SubnetSource, SystemResolver,
};
use crate::error::Result;
use crate::protocol::{BrokerSession, SessionState};
use crate::roster::DeviceRoster;
use crate::scan_loop::ScanLoop;

/// The hub built from a configuration file, talking to real bulbs.
pub type DefaultHub = Hub<YeelightClient, SystemResolver, SubnetChoice>;

/// A running hub: one scan loop keeping the roster fresh and one broker
/// session turning commands into bulb toggles.
#[derive(Debug)]
pub struct Hub<B, R, S> {
    dispatcher: Arc<CommandDispatcher<B>>,
    scan_loop: ScanLoop<R, S>,
    session: BrokerSession<B>,
}

impl DefaultHub {
    /// Builds a hub from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configured subnet override is malformed.
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        let scan = &config.scan;
        let source = SubnetChoice::from(scan.subnet_override()?);

        let prober = SubnetProber::new(
            SystemResolver::new(scan.probe_timeout()).with_max_in_flight(scan.worker_count),
            scan.vendor_signature.clone(),
        );
        let coordinator = Arc::new(ScanCoordinator::new(prober, source, scan.worker_count));

        let roster = Arc::new(DeviceRoster::new());
        let bulbs = YeelightClient::new().with_timeout(scan.bulb_timeout());
        let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&roster), bulbs));

        let scan_loop = ScanLoop::new(
            coordinator,
            roster,
            scan.scan_interval(),
            scan.failure_backoff(),
        );
        let session = BrokerSession::new(&config.broker, Arc::clone(&dispatcher));

        Ok(Self::new(dispatcher, scan_loop, session))
    }
}

impl<B, R, S> Hub<B, R, S>
where
    B: BulbControl,
    R: HostResolver,
    S: SubnetSource,
{
    /// Assembles a hub from its parts.
    ///
    /// `dispatcher` must be the one `session` delivers to, and its roster
    /// the one `scan_loop` publishes into.
    #[must_use]
    pub fn new(
        dispatcher: Arc<CommandDispatcher<B>>,
        scan_loop: ScanLoop<R, S>,
        session: BrokerSession<B>,
    ) -> Self {
        Self {
            dispatcher,
            scan_loop,
            session,
        }
    }

    /// Returns the shared device roster.
    #[must_use]
    pub fn roster(&self) -> &Arc<DeviceRoster> {
        self.dispatcher.roster()
    }

    /// Returns a receiver observing the broker session state.
    #[must_use]
    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.session.watch_state()
    }

    /// Runs the hub until `shutdown` flips to `true`.
    ///
    /// Startup scans once and turns every discovered bulb off before the
    /// broker connection is opened. After that the scan loop runs on its own
    /// task next to the session.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let Self {
            dispatcher,
            scan_loop,
            session,
        } = self;

        tracing::info!(topic = %session.topic(), "Starting hub");

        scan_loop.run_cycle().await;
        dispatcher.turn_off_all().await;

        let scanner = tokio::spawn(scan_loop.run(shutdown.clone()));
        session.run(shutdown).await;

        scanner.abort();
        tracing::info!("Hub stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::*;
    use crate::bulb::testing::{Call, RecordingBulbs};
    use crate::config::BrokerConfig;
    use crate::error::LookupError;
    use crate::types::Subnet;

    struct TableResolver(HashMap<Ipv4Addr, &'static str>);

    impl HostResolver for TableResolver {
        async fn reverse_lookup(&self, address: Ipv4Addr) -> std::result::Result<String, LookupError> {
            self.0
                .get(&address)
                .map(|name| (*name).to_string())
                .ok_or(LookupError::NotFound)
        }
    }

    #[tokio::test]
    async fn startup_turns_off_discovered_bulbs() {
        let resolver = TableResolver(HashMap::from([
            (Ipv4Addr::new(192, 168, 1, 10), "yeelink-bulb-01"),
            (Ipv4Addr::new(192, 168, 1, 12), "yeelink-bulb-02"),
        ]));
        let coordinator = ScanCoordinator::new(
            SubnetProber::new(resolver, "yeelink"),
            Subnet::new(192, 168, 1),
            4,
        );

        let roster = Arc::new(DeviceRoster::new());
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&roster),
            RecordingBulbs::default(),
        ));
        let scan_loop = ScanLoop::new(
            Arc::new(coordinator),
            Arc::clone(&roster),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        // Nothing listens on port 1; the session just keeps failing to connect.
        let broker = BrokerConfig::new("127.0.0.1", "home/bulbs/toggle", "yeehub-test").with_port(1);
        let session = BrokerSession::new(&broker, Arc::clone(&dispatcher));

        let hub = Hub::new(Arc::clone(&dispatcher), scan_loop, session);
        assert!(Arc::ptr_eq(hub.roster(), &roster));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(hub.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("hub did not stop")
            .unwrap();

        assert_eq!(roster.current().len(), 2);
        assert_eq!(
            dispatcher.bulbs().calls(),
            vec![
                Call::TurnOff(Ipv4Addr::new(192, 168, 1, 10)),
                Call::TurnOff(Ipv4Addr::new(192, 168, 1, 12)),
            ]
        );
    }
}
