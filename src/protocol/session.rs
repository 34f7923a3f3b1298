// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent MQTT session delivering toggle commands.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::bulb::BulbControl;
use crate::command::CommandDispatcher;
use crate::config::BrokerConfig;
use crate::error::ProtocolError;

/// Capacity of the MQTT client request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Time allowed for the DISCONNECT packet to go out on shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection state of a [`BrokerSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection; waiting for the next reconnect health check.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and subscribed; messages are delivered.
    Subscribed,
}

impl SessionState {
    /// Returns true if inbound messages are being delivered.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

/// Returns true if `topic` matches the subscription `filter`.
///
/// Supports the `+` (single level) and `#` (remaining levels) wildcards.
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// The persistent connection to the MQTT broker.
///
/// The session owns the MQTT event loop. Every message received on the
/// command topic while [`SessionState::Subscribed`] is handed to the
/// dispatcher inline, so commands are processed one at a time in receipt
/// order. Messages that arrive in any other state are dropped.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use yeehub::DeviceRoster;
/// use yeehub::bulb::YeelightClient;
/// use yeehub::command::CommandDispatcher;
/// use yeehub::config::BrokerConfig;
/// use yeehub::protocol::BrokerSession;
///
/// # async fn example() {
/// let roster = Arc::new(DeviceRoster::new());
/// let dispatcher = Arc::new(CommandDispatcher::new(roster, YeelightClient::new()));
///
/// let config = BrokerConfig::new("192.168.1.2", "home/bulbs/toggle", "yeehub");
/// let session = BrokerSession::new(&config, dispatcher);
///
/// let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
/// session.run(shutdown_rx).await;
/// # }
/// ```
pub struct BrokerSession<B> {
    core: SessionCore<B>,
    event_loop: EventLoop,
    reconnect_interval: Duration,
}

/// Everything the session needs apart from the event loop itself.
struct SessionCore<B> {
    client: AsyncClient,
    host: String,
    port: u16,
    topic: String,
    dispatcher: Arc<CommandDispatcher<B>>,
    state: watch::Sender<SessionState>,
    /// Set while connected but the SUBSCRIBE could not be queued yet.
    subscribe_pending: AtomicBool,
}

impl<B: BulbControl> BrokerSession<B> {
    /// Creates a session for `config`, delivering messages to `dispatcher`.
    ///
    /// No connection is made until [`run`](Self::run) is called.
    #[must_use]
    pub fn new(config: &BrokerConfig, dispatcher: Arc<CommandDispatcher<B>>) -> Self {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(config.keep_alive());
        mqtt_options.set_clean_session(true);

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(SessionState::Disconnected);

        Self {
            core: SessionCore {
                client,
                host: config.host.clone(),
                port: config.port,
                topic: config.topic.clone(),
                dispatcher,
                state,
                subscribe_pending: AtomicBool::new(false),
            },
            event_loop,
            reconnect_interval: config.reconnect_interval(),
        }
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    /// Returns a receiver that observes session state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Returns the command topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.core.topic
    }

    /// Runs the session until `shutdown` flips to `true` or its sender is
    /// dropped.
    ///
    /// The first connection attempt is made immediately. After a drop or a
    /// failed attempt the session stays disconnected for one full period of
    /// the reconnect health check.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let Self {
            core,
            mut event_loop,
            reconnect_interval,
        } = self;

        let mut health_check = tokio::time::interval(reconnect_interval);
        health_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                core.close(&mut event_loop).await;
                break;
            }

            if core.state() == SessionState::Disconnected {
                tokio::select! {
                    _ = health_check.tick() => core.begin_connect(),
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }

            tokio::select! {
                event = event_loop.poll() => {
                    match event {
                        Ok(event) => core.handle_event(event).await,
                        Err(e) => core.on_connection_error(e),
                    }
                    // The ticker kept running while connected; restart the
                    // period so the next attempt waits a full interval.
                    if core.state() == SessionState::Disconnected {
                        health_check.reset();
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        core.close(&mut event_loop).await;
                        break;
                    }
                }
            }
        }

        core.set_state(SessionState::Disconnected);
        tracing::info!("Broker session stopped");
    }
}

impl<B> fmt::Debug for BrokerSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSession")
            .field("host", &self.core.host)
            .field("port", &self.core.port)
            .field("topic", &self.core.topic)
            .field("state", &self.core.state())
            .finish_non_exhaustive()
    }
}

impl<B> SessionCore<B> {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: SessionState) {
        if state == SessionState::Disconnected {
            self.subscribe_pending.store(false, Ordering::Relaxed);
        }
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Broker session state changed");
        }
    }

    fn subscribe_pending(&self) -> bool {
        self.subscribe_pending.load(Ordering::Relaxed)
    }

    /// Queues the SUBSCRIBE for the command topic.
    ///
    /// If the request channel is full the subscription stays pending and is
    /// retried on the next event of the same connection.
    fn subscribe(&self) {
        match self.client.try_subscribe(self.topic.clone(), QoS::AtLeastOnce) {
            Ok(()) => {
                self.subscribe_pending.store(false, Ordering::Relaxed);
                self.set_state(SessionState::Subscribed);
                tracing::info!(topic = %self.topic, "Subscribed to command topic");
            }
            Err(e) => {
                self.subscribe_pending.store(true, Ordering::Relaxed);
                tracing::warn!(
                    topic = %self.topic,
                    error = %ProtocolError::Mqtt(e),
                    "Failed to subscribe to command topic, retrying"
                );
            }
        }
    }

    fn begin_connect(&self) {
        tracing::debug!(host = %self.host, port = self.port, "Connecting to MQTT broker");
        self.set_state(SessionState::Connecting);
    }

    fn on_connection_error(&self, err: ConnectionError) {
        let err = match err {
            ConnectionError::ConnectionRefused(code) => ProtocolError::Refused(format!("{code:?}")),
            other => ProtocolError::Connection(other),
        };
        tracing::error!(
            host = %self.host,
            port = self.port,
            error = %err,
            "Not connected to MQTT broker"
        );
        self.set_state(SessionState::Disconnected);
    }

    /// Sends DISCONNECT and drives the event loop until it is on the wire.
    async fn close(&self, event_loop: &mut EventLoop) {
        if self.state() == SessionState::Disconnected {
            return;
        }

        tracing::info!(host = %self.host, port = self.port, "Disconnecting from MQTT broker");

        if let Err(e) = self.client.try_disconnect() {
            tracing::warn!(error = %ProtocolError::Mqtt(e), "Failed to queue MQTT disconnect");
            return;
        }

        let drain = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, drain).await.is_err() {
            tracing::warn!("Timed out waiting for MQTT disconnect");
        }
        self.set_state(SessionState::Disconnected);
    }
}

impl<B: BulbControl> SessionCore<B> {
    async fn handle_event(&self, event: Event) {
        let is_connack = matches!(event, Event::Incoming(Packet::ConnAck(_)));
        if self.subscribe_pending() && !is_connack {
            self.subscribe();
        }

        match event {
            Event::Incoming(Packet::ConnAck(connack)) => {
                if connack.code != ConnectReturnCode::Success {
                    tracing::error!(
                        host = %self.host,
                        code = ?connack.code,
                        "MQTT broker refused connection"
                    );
                    self.set_state(SessionState::Disconnected);
                    return;
                }

                tracing::debug!(?connack, "MQTT broker connected");
                self.subscribe();
            }
            Event::Incoming(Packet::SubAck(suback)) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Event::Incoming(Packet::Publish(publish)) => {
                if !topic_matches(&self.topic, &publish.topic) {
                    return;
                }
                if !self.state().is_subscribed() {
                    tracing::debug!(
                        topic = %publish.topic,
                        state = %self.state(),
                        "Dropping message received outside a subscribed session"
                    );
                    return;
                }

                tracing::debug!(
                    topic = %publish.topic,
                    payload = %String::from_utf8_lossy(&publish.payload),
                    "MQTT message received"
                );
                self.dispatcher.handle_payload(&publish.payload).await;
            }
            Event::Incoming(Packet::Disconnect) => {
                tracing::info!(host = %self.host, "MQTT broker disconnected");
                self.set_state(SessionState::Disconnected);
            }
            _ => {}
        }
    }
}
