use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::protocol::PeerMessage;
use crate::error::{DeckError, Result};

/// Transport failures surfaced to the user as a status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Nobody is listening under the requested host id
    PeerUnavailable,
    /// Connection refused, reset or otherwise lost
    Network(String),
    /// Error reported on an established channel
    Channel(String),
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerError::PeerUnavailable => write!(f, "peer-unavailable"),
            PeerError::Network(kind) => write!(f, "{}", kind),
            PeerError::Channel(detail) => write!(f, "{}", detail),
        }
    }
}

/// Everything a transport reports about one channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Open,
    Data(PeerMessage),
    Close,
    Error(PeerError),
}

/// Minimal view of a data channel to one peer
pub trait PeerChannel: Send + Sync {
    fn peer_id(&self) -> &str;

    fn is_open(&self) -> bool;

    fn send(&self, message: &PeerMessage) -> Result<()>;
}

/// Channel whose far end is an in-process receiver.
///
/// Starts closed; call [`LocalChannel::set_open`] to simulate the transport
/// reporting channel-open.
pub struct LocalChannel {
    peer_id: String,
    open: AtomicBool,
    sender: mpsc::UnboundedSender<PeerMessage>,
}

impl LocalChannel {
    pub fn new(peer_id: impl Into<String>) -> (Arc<Self>, mpsc::UnboundedReceiver<PeerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel = Arc::new(Self {
            peer_id: peer_id.into(),
            open: AtomicBool::new(false),
            sender,
        });
        (channel, receiver)
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

impl PeerChannel for LocalChannel {
    fn peer_id(&self) -> &str {
        &self.peer_id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    fn send(&self, message: &PeerMessage) -> Result<()> {
        if !self.is_open() {
            return Err(DeckError::ChannelClosed(self.peer_id.clone()));
        }
        self.sender
            .send(message.clone())
            .map_err(|_| DeckError::ChannelClosed(self.peer_id.clone()))
    }
}
