//! In-process message channel between two execution contexts
//!
//! Mirrors a browser `MessageChannel`: two entangled ports, each able to
//! post strings to the other. Delivery is FIFO per direction. Only strings
//! cross, so nothing live can leak from one context into the other.

use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A pair of entangled ports
pub struct MessageChannel {
    pub port1: MessagePort,
    pub port2: MessagePort,
}

impl MessageChannel {
    pub fn new() -> Self {
        let (tx_12, rx_12) = mpsc::unbounded_channel();
        let (tx_21, rx_21) = mpsc::unbounded_channel();
        Self {
            port1: MessagePort::new(tx_12, rx_21),
            port2: MessagePort::new(tx_21, rx_12),
        }
    }

    pub fn into_ports(self) -> (MessagePort, MessagePort) {
        (self.port1, self.port2)
    }
}

impl Default for MessageChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One end of a `MessageChannel`
pub struct MessagePort {
    sender: PortSender,
    receiver: PortReceiver,
}

impl MessagePort {
    fn new(tx: mpsc::UnboundedSender<String>, rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            sender: PortSender {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            receiver: PortReceiver { rx },
        }
    }

    pub fn post_message(&self, message: impl Into<String>) -> Result<()> {
        self.sender.post(message)
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Separate the port into its writing and reading halves
    pub fn split(self) -> (PortSender, PortReceiver) {
        (self.sender, self.receiver)
    }
}

impl fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePort")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Writing half of a port; clones write to the same peer
#[derive(Clone)]
pub struct PortSender {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl PortSender {
    pub fn post(&self, message: impl Into<String>) -> Result<()> {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(SyncError::PortClosed);
        };
        tx.send(message.into()).map_err(|_| SyncError::PortClosed)
    }

    /// Close this direction for every clone; the peer sees end-of-stream
    pub fn close(&self) {
        self.tx.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl fmt::Debug for PortSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Reading half of a port
#[derive(Debug)]
pub struct PortReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl PortReceiver {
    /// Next message, or `None` once the peer has closed
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
