// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scan and command tests with an in-memory network.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use yeehub::bulb::BulbControl;
use yeehub::command::CommandDispatcher;
use yeehub::discovery::{HostResolver, ScanCoordinator, SubnetProber, SubnetSource};
use yeehub::{BulbError, CycleOutcome, Device, DeviceRoster, LookupError, ScanLoop, Subnet};

/// A fake network answering reverse lookups from a table.
#[derive(Clone)]
struct FakeNetwork {
    hosts: Arc<HashMap<Ipv4Addr, &'static str>>,
    lookups: Arc<AtomicUsize>,
}

impl FakeNetwork {
    fn new(hosts: impl IntoIterator<Item = (Ipv4Addr, &'static str)>) -> Self {
        Self {
            hosts: Arc::new(hosts.into_iter().collect()),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl HostResolver for FakeNetwork {
    async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.hosts.get(&address) {
            Some(name) => Ok((*name).to_string()),
            None => Err(LookupError::NotFound),
        }
    }
}

/// A subnet source whose answer can be switched off mid-test.
#[derive(Clone)]
struct Router(Arc<Mutex<Option<Subnet>>>);

impl SubnetSource for Router {
    fn subnet(&self) -> Option<Subnet> {
        *self.0.lock()
    }
}

/// Bulbs that record toggles and fail for one address.
#[derive(Default)]
struct FlakyBulbs {
    toggled: Mutex<Vec<Ipv4Addr>>,
    broken: Option<Ipv4Addr>,
}

impl BulbControl for FlakyBulbs {
    async fn toggle(&self, address: Ipv4Addr) -> Result<(), BulbError> {
        self.toggled.lock().push(address);
        if self.broken == Some(address) {
            return Err(BulbError::ConnectionClosed);
        }
        Ok(())
    }

    async fn turn_off(&self, _address: Ipv4Addr) -> Result<(), BulbError> {
        Ok(())
    }
}

fn home_network() -> FakeNetwork {
    FakeNetwork::new([
        (Ipv4Addr::new(192, 168, 1, 10), "yeelink-bulb-01"),
        (Ipv4Addr::new(192, 168, 1, 11), "unrelated-host"),
        (Ipv4Addr::new(192, 168, 1, 12), "yeelink-bulb-02"),
    ])
}

fn scan_loop(
    network: &FakeNetwork,
    router: Router,
    worker_count: usize,
    roster: &Arc<DeviceRoster>,
) -> ScanLoop<FakeNetwork, Router> {
    let prober = SubnetProber::new(network.clone(), "yeelink");
    let coordinator = ScanCoordinator::new(prober, router, worker_count);
    ScanLoop::new(
        Arc::new(coordinator),
        Arc::clone(roster),
        Duration::from_secs(60),
        Duration::from_secs(1),
    )
}

#[tokio::test]
async fn one_cycle_finds_matching_bulbs_in_order() {
    for worker_count in [1, 3, 16, 256] {
        let network = home_network();
        let router = Router(Arc::new(Mutex::new(Some(Subnet::new(192, 168, 1)))));
        let roster = Arc::new(DeviceRoster::new());

        let outcome = scan_loop(&network, router, worker_count, &roster)
            .run_cycle()
            .await;

        assert_eq!(outcome, CycleOutcome::Updated(2));
        assert_eq!(network.lookups.load(Ordering::SeqCst), 256);
        assert_eq!(
            &roster.current()[..],
            &[
                Device::new("yeelink-bulb-01", Ipv4Addr::new(192, 168, 1, 10)),
                Device::new("yeelink-bulb-02", Ipv4Addr::new(192, 168, 1, 12)),
            ],
            "worker_count = {worker_count}"
        );
    }
}

#[tokio::test]
async fn lost_router_keeps_last_roster() {
    let network = home_network();
    let subnet = Arc::new(Mutex::new(Some(Subnet::new(192, 168, 1))));
    let roster = Arc::new(DeviceRoster::new());
    let scan_loop = scan_loop(&network, Router(Arc::clone(&subnet)), 8, &roster);

    assert_eq!(scan_loop.run_cycle().await, CycleOutcome::Updated(2));
    let before = roster.current();

    *subnet.lock() = None;
    assert_eq!(scan_loop.run_cycle().await, CycleOutcome::Aborted);

    assert_eq!(roster.current(), before);
    assert_eq!(network.lookups.load(Ordering::SeqCst), 256);
}

#[tokio::test]
async fn empty_command_toggles_scanned_roster() {
    let network = home_network();
    let router = Router(Arc::new(Mutex::new(Some(Subnet::new(192, 168, 1)))));
    let roster = Arc::new(DeviceRoster::new());
    scan_loop(&network, router, 4, &roster).run_cycle().await;

    let bulbs = FlakyBulbs {
        broken: Some(Ipv4Addr::new(192, 168, 1, 10)),
        ..FlakyBulbs::default()
    };
    let dispatcher = CommandDispatcher::new(Arc::clone(&roster), bulbs);

    let report = dispatcher.handle_payload(b"").await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(
        *dispatcher.bulbs().toggled.lock(),
        vec![Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 12)]
    );
}
