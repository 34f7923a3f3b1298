// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-address probing by reverse DNS.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::LookupError;
use crate::types::Device;

/// Resolves the hostname of an address.
///
/// Implementations must bound the time a lookup may take.
pub trait HostResolver: Send + Sync + 'static {
    /// Performs a reverse lookup of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when the address has no name, and
    /// another variant for any other failure.
    fn reverse_lookup(
        &self,
        address: Ipv4Addr,
    ) -> impl Future<Output = Result<String, LookupError>> + Send;
}

/// Default cap on lookups running on the blocking pool at once.
const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Reverse lookup through the operating system resolver.
///
/// The blocking `getnameinfo` call runs on tokio's blocking pool. A caller
/// stops waiting once the timeout elapses, but the call itself cannot be
/// cancelled and keeps its slot until the resolver returns. At most
/// `max_in_flight` calls run at once; while all slots are held by stalled
/// calls, new lookups time out without spawning anything.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
    in_flight: Arc<Semaphore>,
}

impl SystemResolver {
    /// Creates a resolver that gives up after `timeout` per address.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        }
    }

    /// Sets how many lookups may run at once (default: 256, minimum: 1).
    #[must_use]
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Returns the per-address timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl HostResolver for SystemResolver {
    async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, LookupError> {
        let ip = IpAddr::V4(address);
        let in_flight = Arc::clone(&self.in_flight);
        let lookup = async move {
            let permit = in_flight
                .acquire_owned()
                .await
                .map_err(|e| LookupError::Failed(e.to_string()))?;

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                dns_lookup::lookup_addr(&ip)
            })
            .await
            .map_err(|join| LookupError::Failed(join.to_string()))?
            .map_err(|e| classify_lookup_error(&e))
        };

        // Safe: probe timeouts are configured in milliseconds well below u64::MAX
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = self.timeout.as_millis() as u64;

        tokio::time::timeout(self.timeout, lookup)
            .await
            .unwrap_or(Err(LookupError::TimedOut(timeout_ms)))
    }
}

/// Maps a resolver I/O error onto the probe outcome taxonomy.
///
/// `getnameinfo` reports a missing PTR record as `EAI_NONAME`, which surfaces
/// either as `NotFound` or only through its message depending on the libc.
fn classify_lookup_error(err: &io::Error) -> LookupError {
    const NO_NAME_MESSAGES: &[&str] = &[
        "not known",
        "unknown host",
        "no address associated",
        "nodename nor servname",
    ];

    if err.kind() == io::ErrorKind::NotFound {
        return LookupError::NotFound;
    }

    let message = err.to_string().to_lowercase();
    if NO_NAME_MESSAGES.iter().any(|m| message.contains(m)) {
        LookupError::NotFound
    } else {
        LookupError::Failed(err.to_string())
    }
}

/// Decides whether a single address is a bulb.
///
/// An address matches when its reverse-DNS name contains the vendor
/// signature. Each call performs exactly one lookup; there are no retries.
#[derive(Debug)]
pub struct SubnetProber<R> {
    resolver: R,
    signature: String,
}

impl<R: HostResolver> SubnetProber<R> {
    /// Creates a prober matching hostnames that contain `signature`.
    #[must_use]
    pub fn new(resolver: R, signature: impl Into<String>) -> Self {
        Self {
            resolver,
            signature: signature.into(),
        }
    }

    /// Returns the vendor signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Probes `address`, returning a [`Device`] when it matches.
    ///
    /// A missing reverse record is a silent non-match. Other lookup failures
    /// are logged and also count as a non-match.
    pub async fn probe(&self, address: Ipv4Addr) -> Option<Device> {
        match self.resolver.reverse_lookup(address).await {
            Ok(hostname) if hostname.contains(&self.signature) => {
                tracing::info!(hostname = %hostname, address = %address, "Found new bulb");
                Some(Device::new(hostname, address))
            }
            Ok(hostname) => {
                tracing::trace!(hostname = %hostname, address = %address, "Not a bulb");
                None
            }
            Err(LookupError::NotFound) => None,
            Err(e) => {
                tracing::error!(address = %address, error = %e, "Reverse lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct TableResolver(HashMap<Ipv4Addr, Result<String, LookupError>>);

    impl HostResolver for TableResolver {
        async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, LookupError> {
            self.0
                .get(&address)
                .cloned()
                .unwrap_or(Err(LookupError::NotFound))
        }
    }

    fn prober() -> SubnetProber<TableResolver> {
        let table = HashMap::from([
            (
                Ipv4Addr::new(192, 168, 1, 10),
                Ok("yeelink-light-color1_mibt1a2b".to_string()),
            ),
            (
                Ipv4Addr::new(192, 168, 1, 11),
                Ok("nas.fritz.box".to_string()),
            ),
            (
                Ipv4Addr::new(192, 168, 1, 12),
                Err(LookupError::Failed("network unreachable".to_string())),
            ),
            (Ipv4Addr::new(192, 168, 1, 13), Err(LookupError::TimedOut(1000))),
        ]);
        SubnetProber::new(TableResolver(table), "yeelink")
    }

    #[tokio::test]
    async fn matching_hostname_yields_device() {
        let address = Ipv4Addr::new(192, 168, 1, 10);
        let device = prober().probe(address).await.unwrap();
        assert_eq!(device.identifier(), "yeelink-light-color1_mibt1a2b");
        assert_eq!(device.address(), address);
    }

    #[tokio::test]
    async fn other_hostname_is_no_match() {
        assert!(prober().probe(Ipv4Addr::new(192, 168, 1, 11)).await.is_none());
    }

    #[tokio::test]
    async fn lookup_failures_are_no_match() {
        let prober = prober();
        assert!(prober.probe(Ipv4Addr::new(192, 168, 1, 12)).await.is_none());
        assert!(prober.probe(Ipv4Addr::new(192, 168, 1, 13)).await.is_none());
        assert!(prober.probe(Ipv4Addr::new(192, 168, 1, 99)).await.is_none());
    }

    #[test]
    fn prober_keeps_signature() {
        let prober = SubnetProber::new(TableResolver(HashMap::new()), "yeelink");
        assert_eq!(prober.signature(), "yeelink");
    }

    #[test]
    fn classify_not_found_kind() {
        let err = io::Error::new(io::ErrorKind::NotFound, "lookup failed");
        assert_eq!(classify_lookup_error(&err), LookupError::NotFound);
    }

    #[test]
    fn classify_no_name_messages() {
        for message in [
            "Name or service not known",
            "Unknown host",
            "No address associated with hostname",
            "nodename nor servname provided, or not known",
        ] {
            let err = io::Error::other(message);
            assert_eq!(classify_lookup_error(&err), LookupError::NotFound, "{message}");
        }
    }

    #[test]
    fn classify_other_failures() {
        let err = io::Error::other("Temporary failure in name resolution");
        assert!(matches!(classify_lookup_error(&err), LookupError::Failed(_)));
    }

    #[test]
    fn system_resolver_timeout() {
        let resolver = SystemResolver::new(Duration::from_millis(250));
        assert_eq!(resolver.timeout(), Duration::from_millis(250));
        assert_eq!(resolver.in_flight.available_permits(), DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn max_in_flight_is_at_least_one() {
        let resolver = SystemResolver::new(Duration::from_secs(1)).with_max_in_flight(0);
        assert_eq!(resolver.in_flight.available_permits(), 1);
    }

    #[tokio::test]
    async fn saturated_resolver_times_out_without_spawning() {
        let resolver = SystemResolver::new(Duration::from_millis(50)).with_max_in_flight(1);
        // Stands in for a lookup stuck in getnameinfo.
        let _stalled = Arc::clone(&resolver.in_flight).try_acquire_owned().unwrap();

        let result = resolver.reverse_lookup(Ipv4Addr::LOCALHOST).await;

        assert_eq!(result, Err(LookupError::TimedOut(50)));
        assert_eq!(resolver.in_flight.available_permits(), 0);
    }
}
