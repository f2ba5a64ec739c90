//! NATS JetStream delivery channel
//!
//! Connecting declares a stream that captures the configured subject.
//! `get_or_create_stream` makes the declaration idempotent. Publishing does
//! not wait for the JetStream acknowledgement; `flush` waits for the server
//! to have read everything handed over.
//!
//! The client is allowed a single reconnect of its own. Reconnect cycles
//! belong to the publisher, which replaces the whole channel.

use crate::config::PublisherConfig;
use crate::publish::channel::{Connector, DeliveryChannel, PublishEnvelope};
use crate::ChannelError;
use async_nats::jetstream::{self, stream};
use async_nats::connection::State;
use async_nats::ConnectOptions;
use async_trait::async_trait;
use std::time::Duration;

const CLIENT_RECONNECTS: usize = 1;

/// Opens JetStream channels to one subject
#[derive(Debug, Clone)]
pub struct NatsConnector {
    server_url: String,
    subject: String,
    stream: String,
    client_name: String,
    connect_timeout: Duration,
    flush_timeout: Duration,
}

impl NatsConnector {
    pub fn new(
        server_url: impl Into<String>,
        subject: impl Into<String>,
        stream: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            subject: subject.into(),
            stream: stream.into(),
            client_name: "notice-sweep".to_string(),
            connect_timeout: Duration::from_secs(5),
            flush_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(&config.server_url, &config.subject, &config.stream)
    }

    /// Sets the client name reported to the server
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }
}

#[async_trait]
impl Connector for NatsConnector {
    fn destination(&self) -> &str {
        &self.subject
    }

    async fn connect(&self) -> Result<Box<dyn DeliveryChannel>, ChannelError> {
        let client = ConnectOptions::new()
            .name(&self.client_name)
            .connection_timeout(self.connect_timeout)
            .max_reconnects(Some(CLIENT_RECONNECTS))
            .connect(self.server_url.as_str())
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        let context = jetstream::new(client.clone());
        context
            .get_or_create_stream(stream::Config {
                name: self.stream.clone(),
                subjects: vec![self.subject.clone()],
                ..Default::default()
            })
            .await
            .map_err(|e| ChannelError::Declare {
                destination: self.stream.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(
            server = %self.server_url,
            stream = %self.stream,
            subject = %self.subject,
            "Connected to broker"
        );

        Ok(Box::new(NatsChannel {
            client,
            context,
            subject: self.subject.clone(),
            flush_timeout: self.flush_timeout,
        }))
    }
}

struct NatsChannel {
    client: async_nats::Client,
    context: jetstream::Context,
    subject: String,
    flush_timeout: Duration,
}

/// The client queues publishes while disconnected; refuse instead
fn require_connected(state: State) -> Result<(), String> {
    match state {
        State::Connected => Ok(()),
        other => Err(format!("connection is {:?}", other)),
    }
}

#[async_trait]
impl DeliveryChannel for NatsChannel {
    async fn deliver(&self, envelope: &PublishEnvelope) -> Result<(), ChannelError> {
        require_connected(self.client.connection_state()).map_err(|message| {
            ChannelError::Deliver {
                identity: envelope.identity.clone(),
                message,
            }
        })?;

        // The ack future is dropped; the broker still persists the message
        self.context
            .publish(self.subject.clone(), envelope.payload.clone())
            .await
            .map_err(|e| ChannelError::Deliver {
                identity: envelope.identity.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), ChannelError> {
        require_connected(self.client.connection_state()).map_err(ChannelError::Flush)?;

        match tokio::time::timeout(self.flush_timeout, self.client.flush()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ChannelError::Flush(e.to_string())),
            Err(_) => Err(ChannelError::Flush(format!(
                "no reply within {:?}",
                self.flush_timeout
            ))),
        }
    }
}
