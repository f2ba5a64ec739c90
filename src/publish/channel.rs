//! Delivery channel abstraction
//!
//! The publisher only sees these traits, so it can run against a real broker
//! or the in-memory broker used in tests.

use crate::publish::record::CleanRecord;
use crate::ChannelError;
use async_trait::async_trait;
use bytes::Bytes;

/// A serialized record ready for the broker
#[derive(Debug, Clone, PartialEq)]
pub struct PublishEnvelope {
    /// Identity of the record, used downstream for idempotent storage
    pub identity: String,

    /// JSON body
    pub payload: Bytes,
}

impl PublishEnvelope {
    pub fn from_record(record: &CleanRecord) -> Result<Self, ChannelError> {
        Ok(Self {
            identity: record.entity_id.clone(),
            payload: Bytes::from(serde_json::to_vec(record)?),
        })
    }
}

/// An open connection to the destination
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Hands one envelope to the broker without waiting for a consumer
    async fn deliver(&self, envelope: &PublishEnvelope) -> Result<(), ChannelError>;

    /// Waits until everything delivered so far has reached the broker
    ///
    /// Channels whose `deliver` already waits for the broker keep the default.
    async fn flush(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Knows how to open a channel
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Human-readable name of the destination
    fn destination(&self) -> &str;

    /// Connects and declares the destination
    ///
    /// Declaring an already existing destination must succeed.
    async fn connect(&self) -> Result<Box<dyn DeliveryChannel>, ChannelError>;
}
