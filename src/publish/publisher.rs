//! Buffering publisher
//!
//! Records go straight to the channel while it is healthy. Anything that
//! cannot be delivered lands in a FIFO buffer, and a reconnect cycle runs on
//! a background task so publishing never waits on the network. Every publish
//! call first reconciles: a finished reconnect is picked up and the buffer is
//! drained in order before the new record is considered.

use crate::config::PublisherConfig;
use crate::publish::channel::{Connector, DeliveryChannel, PublishEnvelope};
use crate::publish::record::CleanRecord;
use crate::state::ConnectionState;
use crate::ChannelError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type ReconnectTask = JoinHandle<Result<Box<dyn DeliveryChannel>, ChannelError>>;

/// Bounded, fixed-interval reconnect cycle
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Connection attempts per cycle
    pub attempts: u32,

    /// Pause between attempts
    pub interval: Duration,
}

impl ReconnectPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(
            config.reconnect_attempts,
            Duration::from_millis(config.reconnect_interval_ms),
        )
    }
}

/// What happened to a published record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the channel
    Delivered,
    /// Queued until the channel is back
    Buffered,
}

const DEFAULT_CONFIRM_BATCH: usize = 100;

/// Publisher that survives broker outages
///
/// Records handed to the channel stay in `in_flight` until the channel
/// confirms them. If the channel is lost first they go back to the front of
/// the buffer, so a record may reach the broker twice but is never dropped.
pub struct ReliablePublisher<C: Connector> {
    connector: Arc<C>,
    policy: ReconnectPolicy,
    channel: Option<Box<dyn DeliveryChannel>>,
    reconnect: Option<ReconnectTask>,
    buffer: VecDeque<PublishEnvelope>,
    in_flight: VecDeque<PublishEnvelope>,
    confirm_batch: usize,
    delivered: u64,
}

impl<C: Connector> ReliablePublisher<C> {
    /// Creates a disconnected publisher; the first reconcile starts connecting
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        Self {
            connector: Arc::new(connector),
            policy,
            channel: None,
            reconnect: None,
            buffer: VecDeque::new(),
            in_flight: VecDeque::new(),
            confirm_batch: DEFAULT_CONFIRM_BATCH,
            delivered: 0,
        }
    }

    /// Sets how many records may await confirmation at once
    pub fn with_confirm_batch(mut self, batch: usize) -> Self {
        self.confirm_batch = batch.max(1);
        self
    }

    pub fn state(&self) -> ConnectionState {
        if self.channel.is_some() {
            ConnectionState::Connected
        } else if self.reconnect.is_some() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Records waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Records handed to the channel and not taken back since
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Picks up a finished reconnect, drains the buffer, or starts a new cycle
    ///
    /// Never waits for a reconnect that is still running.
    pub async fn reconcile(&mut self) -> ConnectionState {
        if self.channel.is_none() {
            match self.reconnect.as_ref().map(JoinHandle::is_finished) {
                Some(true) => {
                    if let Some(task) = self.reconnect.take() {
                        self.finish_reconnect(task).await;
                    }
                }
                Some(false) => {}
                None => self.start_reconnect(),
            }
        }

        if self.state().can_deliver() && !self.buffer.is_empty() {
            self.drain_buffer().await;
        }

        self.state()
    }

    /// Delivers or buffers one record
    ///
    /// Only serialization can fail; channel trouble degrades to buffering.
    pub async fn publish(&mut self, record: &CleanRecord) -> Result<PublishOutcome, ChannelError> {
        let envelope = PublishEnvelope::from_record(record)?;
        Ok(self.publish_envelope(envelope).await)
    }

    pub async fn publish_envelope(&mut self, envelope: PublishEnvelope) -> PublishOutcome {
        self.reconcile().await;

        // Anything still buffered must go out first
        if !self.buffer.is_empty() {
            self.buffer.push_back(envelope);
            return PublishOutcome::Buffered;
        }

        let Some(channel) = &self.channel else {
            self.buffer.push_back(envelope);
            return PublishOutcome::Buffered;
        };

        let result = channel.deliver(&envelope).await;
        match result {
            Ok(()) => {
                if self.record_delivery(envelope).await {
                    PublishOutcome::Delivered
                } else {
                    PublishOutcome::Buffered
                }
            }
            Err(e) => {
                tracing::warn!(
                    identity = %envelope.identity,
                    error = %e,
                    "Delivery failed, buffering"
                );
                self.buffer.push_back(envelope);
                self.abandon_channel().await;
                PublishOutcome::Buffered
            }
        }
    }

    /// Last attempt to empty the buffer before shutdown
    ///
    /// Confirms what the channel already holds, waits for a running reconnect
    /// cycle or runs a fresh one, then drains what it can. Returns the number
    /// of records left behind.
    pub async fn flush(&mut self) -> usize {
        self.confirm().await;

        if !self.buffer.is_empty() {
            if self.channel.is_none() {
                if self.reconnect.is_none() {
                    self.start_reconnect();
                }
                if let Some(task) = self.reconnect.take() {
                    self.finish_reconnect(task).await;
                }
            }

            if self.channel.is_some() {
                self.drain_buffer().await;
                self.confirm().await;
            }
        }

        if let Some(task) = self.reconnect.take() {
            task.abort();
        }

        if !self.buffer.is_empty() {
            tracing::error!(
                remaining = self.buffer.len(),
                destination = self.connector.destination(),
                "Records left undelivered at shutdown"
            );
        }
        self.buffer.len()
    }

    fn start_reconnect(&mut self) {
        tracing::info!(
            destination = self.connector.destination(),
            attempts = self.policy.attempts,
            "Starting reconnect cycle"
        );
        let connector = Arc::clone(&self.connector);
        let policy = self.policy;
        self.reconnect = Some(tokio::spawn(reconnect_cycle(connector, policy)));
    }

    async fn finish_reconnect(&mut self, task: ReconnectTask) {
        match task.await {
            Ok(Ok(channel)) => {
                tracing::info!(
                    destination = self.connector.destination(),
                    buffered = self.buffer.len(),
                    "Broker connection established"
                );
                self.channel = Some(channel);
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    destination = self.connector.destination(),
                    error = %e,
                    buffered = self.buffer.len(),
                    "Reconnect cycle exhausted, still buffering"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconnect task did not complete");
            }
        }
    }

    async fn drain_buffer(&mut self) {
        while let Some(envelope) = self.buffer.pop_front() {
            let Some(channel) = &self.channel else {
                self.buffer.push_front(envelope);
                return;
            };

            let result = channel.deliver(&envelope).await;
            match result {
                Ok(()) => {
                    if !self.record_delivery(envelope).await {
                        return;
                    }
                }
                Err(e) => {
                    self.buffer.push_front(envelope);
                    tracing::warn!(
                        error = %e,
                        buffered = self.buffer.len(),
                        "Buffer drain interrupted"
                    );
                    self.abandon_channel().await;
                    return;
                }
            }
        }

        tracing::debug!("Buffer drained");
    }

    /// Returns false when confirming lost the channel
    async fn record_delivery(&mut self, envelope: PublishEnvelope) -> bool {
        self.delivered += 1;
        self.in_flight.push_back(envelope);

        if self.in_flight.len() >= self.confirm_batch {
            self.confirm().await
        } else {
            true
        }
    }

    /// Asks the channel to confirm everything in flight
    async fn confirm(&mut self) -> bool {
        let Some(channel) = &self.channel else {
            return self.in_flight.is_empty();
        };
        if self.in_flight.is_empty() {
            return true;
        }

        let result = channel.flush().await;
        match result {
            Ok(()) => {
                self.in_flight.clear();
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    unconfirmed = self.in_flight.len(),
                    "Broker did not confirm delivered records"
                );
                self.abandon_channel().await;
                false
            }
        }
    }

    /// Drops the channel and requeues whatever it never confirmed
    async fn abandon_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            if !self.in_flight.is_empty() && channel.flush().await.is_ok() {
                self.in_flight.clear();
            }
        }

        if !self.in_flight.is_empty() {
            tracing::warn!(
                requeued = self.in_flight.len(),
                "Unconfirmed records returned to the buffer"
            );
            self.delivered = self.delivered.saturating_sub(self.in_flight.len() as u64);
            while let Some(envelope) = self.in_flight.pop_back() {
                self.buffer.push_front(envelope);
            }
        }

        if self.reconnect.is_none() {
            self.start_reconnect();
        }
    }
}

async fn reconnect_cycle<C: Connector>(
    connector: Arc<C>,
    policy: ReconnectPolicy,
) -> Result<Box<dyn DeliveryChannel>, ChannelError> {
    let mut attempt = 1;
    loop {
        match connector.connect().await {
            Ok(channel) => return Ok(channel),
            Err(e) if attempt >= policy.attempts => return Err(e),
            Err(e) => {
                tracing::debug!(
                    attempt,
                    max_attempts = policy.attempts,
                    error = %e,
                    "Connect attempt failed"
                );
                attempt += 1;
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}
