//! Student side of the WebSocket transport.

use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};

use super::channel::{ChannelEvent, PeerChannel, PeerError};
use super::protocol::PeerMessage;
use super::room::RoomCode;
use super::student::{StudentSession, StudentUpdate};
use crate::error::{DeckError, Result};

/// Outgoing half of the student's socket
struct SocketChannel {
    peer_id: String,
    open: AtomicBool,
    sender: mpsc::UnboundedSender<Message>,
}

impl PeerChannel for SocketChannel {
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
        let text = serde_json::to_string(message)?;
        self.sender
            .send(Message::Text(text))
            .map_err(|_| DeckError::ChannelClosed(self.peer_id.clone()))
    }
}

/// A student connected (or connecting) to a host over WebSocket.
///
/// Submissions made before the socket opens are queued by the session.
pub struct StudentClient {
    session: Arc<Mutex<StudentSession>>,
    channel: Arc<SocketChannel>,
    updates: mpsc::UnboundedReceiver<StudentUpdate>,
    task: JoinHandle<()>,
}

impl StudentClient {
    /// Start connecting to `ws://<server>/peer/tcu-deck-<code>` in the background
    pub fn connect(server: &str, room_code: RoomCode, question_count: u32) -> Self {
        let host_peer_id = room_code.host_peer_id();
        let url = format!("ws://{}/peer/{}", server, host_peer_id);

        let (sender, outgoing) = mpsc::unbounded_channel();
        let channel = Arc::new(SocketChannel {
            peer_id: host_peer_id,
            open: AtomicBool::new(false),
            sender,
        });
        let session = Arc::new(Mutex::new(StudentSession::new(
            room_code,
            channel.clone(),
            question_count,
        )));
        let (update_tx, updates) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_socket(
            url,
            channel.clone(),
            session.clone(),
            outgoing,
            update_tx,
        ));

        Self {
            session,
            channel,
            updates,
            task,
        }
    }

    pub fn session(&self) -> Arc<Mutex<StudentSession>> {
        self.session.clone()
    }

    pub async fn next_update(&mut self) -> Option<StudentUpdate> {
        self.updates.recv().await
    }

    /// Wait for an update matching `predicate`; `None` on timeout or when
    /// the connection task has ended.
    pub async fn wait_for<F>(&mut self, limit: Duration, mut predicate: F) -> Option<StudentUpdate>
    where
        F: FnMut(&StudentUpdate) -> bool,
    {
        let wait = async {
            while let Some(update) = self.updates.recv().await {
                if predicate(&update) {
                    return Some(update);
                }
            }
            None
        };
        tokio::time::timeout(limit, wait).await.ok().flatten()
    }

    /// Close the socket after everything already sent has been written
    pub async fn close(self) {
        self.channel.open.store(false, Ordering::SeqCst);
        let _ = self.channel.sender.send(Message::Close(None));
        if tokio::time::timeout(Duration::from_secs(2), self.task).await.is_err() {
            tracing::debug!("Socket task did not finish after close");
        }
    }
}

async fn run_socket(
    url: String,
    channel: Arc<SocketChannel>,
    session: Arc<Mutex<StudentSession>>,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    updates: mpsc::UnboundedSender<StudentUpdate>,
) {
    let deliver = |event: ChannelEvent| {
        let session = session.clone();
        let updates = updates.clone();
        async move {
            let update = session.lock().await.on_event(event);
            let _ = updates.send(update);
        }
    };

    tracing::debug!(url = %url, "Connecting to host");
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            deliver(ChannelEvent::Error(connect_error(&e))).await;
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
            if closing {
                break;
            }
        }
    });

    channel.open.store(true, Ordering::SeqCst);
    deliver(ChannelEvent::Open).await;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<PeerMessage>(&text) {
                Ok(message) => deliver(ChannelEvent::Data(message)).await,
                Err(e) => {
                    tracing::error!(error = %e, raw_message = %text, "Failed to parse peer message");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                deliver(ChannelEvent::Error(PeerError::Channel(e.to_string()))).await;
                break;
            }
        }
    }

    channel.open.store(false, Ordering::SeqCst);
    deliver(ChannelEvent::Close).await;
    writer.abort();
}

fn connect_error(error: &tungstenite::Error) -> PeerError {
    match error {
        tungstenite::Error::Http(response) if response.status() == StatusCode::NOT_FOUND => {
            PeerError::PeerUnavailable
        }
        tungstenite::Error::Io(e) => PeerError::Network(e.kind().to_string()),
        other => PeerError::Network(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_mapping() {
        let refused = tungstenite::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert_eq!(
            connect_error(&refused),
            PeerError::Network(std::io::ErrorKind::ConnectionRefused.to_string())
        );

        let response = tungstenite::http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(None)
            .unwrap();
        assert_eq!(connect_error(&tungstenite::Error::Http(response)), PeerError::PeerUnavailable);
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_network_error() {
        // port 9 (discard) is not expected to accept WebSocket upgrades
        let room: RoomCode = "AB12".parse().unwrap();
        let mut client = StudentClient::connect("127.0.0.1:9", room, 10);

        let update = client
            .wait_for(Duration::from_secs(5), |u| matches!(u, StudentUpdate::Failed(_)))
            .await;
        assert!(update.is_some());
        assert!(!client.session().lock().await.is_connected());
    }
}
