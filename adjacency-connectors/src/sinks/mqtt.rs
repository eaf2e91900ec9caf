//! MQTT notification sink
//!
//! Publishes each notification as JSON to `<prefix>/<notification name>`,
//! e.g. `adjacency/member_adjacency_enter`. Subscribers filter with
//! `adjacency/#` or pick individual notifications.
//!
//! rumqttc splits the connection into a cheap [`AsyncClient`] handle and an
//! [`EventLoop`] that does the network I/O. The loop must be polled for
//! anything to leave the process; [`spawn_event_loop`] does that on a tokio
//! task and keeps reconnecting until every client handle is dropped.

use std::time::Duration;

use adjacency_core::{AdjacencyEvent, Timestamp};
use log::{debug, warn};
use rumqttc::{AsyncClient, ConnectionError, EventLoop, MqttOptions};
use tokio::task::JoinHandle;

pub use rumqttc::QoS;

use crate::payload::event_body;
use crate::{AsyncNotificationSink, ConnectorError, ConnectorResult};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker and topic settings
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic_prefix: String,
    pub qos: QoS,
    pub retain: bool,
    pub keep_alive: Duration,
    pub credentials: Option<(String, String)>,
    /// Outgoing request queue length
    pub capacity: usize,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: format!("adjacency-{}", env!("CARGO_PKG_VERSION")),
            topic_prefix: "adjacency".into(),
            qos: QoS::AtLeastOnce,
            retain: false,
            keep_alive: Duration::from_secs(30),
            credentials: None,
            capacity: 64,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Topic a notification is published to
    pub fn topic(&self, event_name: &str) -> String {
        format!("{}/{}", self.topic_prefix.trim_end_matches('/'), event_name)
    }

    fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::ConfigError("broker host is empty".into()));
        }
        let prefix = self.topic_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Err(ConnectorError::ConfigError("topic prefix is empty".into()));
        }
        if prefix.contains(['+', '#']) {
            return Err(ConnectorError::ConfigError(format!(
                "topic prefix {prefix:?} contains a wildcard"
            )));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Publishes notifications to an MQTT broker
pub struct MqttSink {
    client: AsyncClient,
    config: MqttConfig,
}

impl MqttSink {
    /// Sink plus the event loop that must be driven for it to publish
    pub fn new(config: MqttConfig) -> ConnectorResult<(Self, EventLoop)> {
        config.validate()?;
        let (client, event_loop) = AsyncClient::new(config.options(), config.capacity);
        Ok((Self { client, config }, event_loop))
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl AsyncNotificationSink for MqttSink {
    async fn deliver(&self, event: &AdjacencyEvent, fired_at: Timestamp) -> ConnectorResult<()> {
        let body = event_body(event, fired_at)?;
        self.client
            .publish(self.config.topic(event.name()), self.config.qos, self.config.retain, body)
            .await
            .map_err(|e| ConnectorError::ProtocolError(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

/// Poll the event loop on a tokio task until all client handles are gone
pub fn spawn_event_loop(mut event_loop: EventLoop) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(event) => debug!("mqtt: {:?}", event),
                Err(ConnectionError::RequestsDone) => break,
                Err(err) => {
                    warn!("mqtt: connection error: {}", err);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = MqttConfig::new("broker.local", 1883)
            .client_id("hallway")
            .topic_prefix("home/adjacency/")
            .qos(QoS::AtMostOnce)
            .retain(true)
            .credentials("user", "secret");

        assert_eq!(config.client_id, "hallway");
        assert_eq!(config.qos, QoS::AtMostOnce);
        assert!(config.retain);
        assert_eq!(config.credentials, Some(("user".into(), "secret".into())));
        assert_eq!(
            config.topic("member_adjacency_enter"),
            "home/adjacency/member_adjacency_enter"
        );
    }

    #[test]
    fn rejects_bad_prefix() {
        assert!(MqttConfig::new("broker.local", 1883).topic_prefix("").validate().is_err());
        assert!(MqttConfig::new("broker.local", 1883).topic_prefix("a/#").validate().is_err());
        assert!(MqttConfig::new("", 1883).validate().is_err());
    }

    #[test]
    fn sink_construction_does_not_connect() {
        let result = MqttSink::new(MqttConfig::new("broker.invalid", 1883));
        assert!(result.is_ok());
    }
}
