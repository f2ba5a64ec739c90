//! In-process broker
//!
//! Stands in for the real broker in tests and dry runs. Clones share the same
//! state, so a test can keep a handle while the publisher owns another and
//! flip availability mid-run.

use crate::publish::channel::{Connector, DeliveryChannel, PublishEnvelope};
use crate::ChannelError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Inner {
    destination: String,
    available: AtomicBool,
    declared: AtomicBool,
    connect_attempts: AtomicUsize,
    delivered: Mutex<Vec<PublishEnvelope>>,
}

/// Broker that keeps every delivered envelope in memory
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    /// Creates an available broker with one destination
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                destination: destination.into(),
                available: AtomicBool::new(true),
                declared: AtomicBool::new(false),
                connect_attempts: AtomicUsize::new(0),
                delivered: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Takes the broker down or brings it back
    ///
    /// While unavailable, connects and deliveries fail.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    pub fn is_declared(&self) -> bool {
        self.inner.declared.load(Ordering::SeqCst)
    }

    pub fn connect_attempts(&self) -> usize {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<PublishEnvelope> {
        self.inner
            .delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Identities in delivery order
    pub fn delivered_identities(&self) -> Vec<String> {
        self.delivered().into_iter().map(|e| e.identity).collect()
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    fn destination(&self) -> &str {
        &self.inner.destination
    }

    async fn connect(&self) -> Result<Box<dyn DeliveryChannel>, ChannelError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(ChannelError::Connect(format!(
                "memory broker '{}' is offline",
                self.inner.destination
            )));
        }

        // Declaring twice is a no-op
        self.inner.declared.store(true, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl DeliveryChannel for MemoryBroker {
    async fn deliver(&self, envelope: &PublishEnvelope) -> Result<(), ChannelError> {
        if !self.is_available() {
            return Err(ChannelError::Deliver {
                identity: envelope.identity.clone(),
                message: "broker offline".to_string(),
            });
        }

        self.inner
            .delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(envelope.clone());
        Ok(())
    }
}
