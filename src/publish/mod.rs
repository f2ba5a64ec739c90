//! Downstream delivery
//!
//! # Components
//!
//! - `CleanRecord`: the record shape consumers receive
//! - `Connector` / `DeliveryChannel`: the broker seam
//! - `NatsConnector`: JetStream implementation
//! - `MemoryBroker`: in-process implementation for tests and dry runs
//! - `ReliablePublisher`: buffering, reconnecting front of the channel

mod channel;
mod memory;
mod nats;
mod publisher;
mod record;

pub use channel::{Connector, DeliveryChannel, PublishEnvelope};
pub use memory::MemoryBroker;
pub use nats::NatsConnector;
pub use publisher::{PublishOutcome, ReconnectPolicy, ReliablePublisher};
pub use record::{CleanRecord, UNKNOWN};
