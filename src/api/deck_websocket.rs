use futures::{Sink, SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::error::{DeckError, Result};
use crate::peer::{ChannelEvent, HostSession, PeerChannel, PeerError, PeerMessage};
use crate::storage::{QUIZ_RESULTS_KEY, THOUGHTS_KEY};

/// Host-side channel to one student socket
pub struct WsChannel {
    peer_id: String,
    open: AtomicBool,
    sender: mpsc::UnboundedSender<Message>,
}

impl WsChannel {
    pub fn new(peer_id: String, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            peer_id,
            open: AtomicBool::new(false),
            sender,
        }
    }

    fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

impl PeerChannel for WsChannel {
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
            .send(Message::text(text))
            .map_err(|_| DeckError::ChannelClosed(self.peer_id.clone()))
    }
}

pub async fn handle_student_socket(websocket: WebSocket, session: Arc<HostSession>) {
    let peer_id = session.next_student_id();
    tracing::info!(peer_id = %peer_id, "New student WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let channel = Arc::new(WsChannel::new(peer_id.clone(), tx));
    session.accept(channel.clone()).await;

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    channel.set_open(true);
    session.on_event(&peer_id, ChannelEvent::Open).await;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if message.is_close() {
                    break;
                }
                handle_websocket_message(&session, &peer_id, message).await;
            }
            Err(e) => {
                session
                    .on_event(&peer_id, ChannelEvent::Error(PeerError::Channel(e.to_string())))
                    .await;
                break;
            }
        }
    }

    channel.set_open(false);
    session.on_event(&peer_id, ChannelEvent::Close).await;
    sender_task.abort();
    tracing::info!(peer_id = %peer_id, "Student WebSocket connection closed");
}

async fn handle_websocket_message(session: &HostSession, peer_id: &str, message: Message) {
    let Ok(text) = message.to_str() else {
        return;
    };
    tracing::debug!(peer_id = %peer_id, "Received peer message: {}", text);

    match serde_json::from_str::<PeerMessage>(text) {
        Ok(peer_message) => {
            session.on_event(peer_id, ChannelEvent::Data(peer_message)).await;
        }
        Err(e) => {
            tracing::error!(
                peer_id = %peer_id,
                error = %e,
                raw_message = %text,
                "Failed to parse peer message"
            );
        }
    }
}

/// Push the rendered value of every changed key to a deck view
pub async fn handle_view_socket(websocket: WebSocket, session: Arc<HostSession>) {
    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let mut events = session.subscribe_storage().await;
    tracing::info!("Deck view connected");

    for key in [QUIZ_RESULTS_KEY, THOUGHTS_KEY] {
        if !push_view_update(&session, &mut ws_sender, key).await {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let keys: Vec<&str> = match event {
                    Ok(event) if event.key == QUIZ_RESULTS_KEY => vec![QUIZ_RESULTS_KEY],
                    Ok(event) if event.key == THOUGHTS_KEY => vec![THOUGHTS_KEY],
                    Ok(_) => Vec::new(),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Deck view lagged, re-sending everything");
                        vec![QUIZ_RESULTS_KEY, THOUGHTS_KEY]
                    }
                    Err(RecvError::Closed) => break,
                };
                for key in keys {
                    if !push_view_update(&session, &mut ws_sender, key).await {
                        return;
                    }
                }
            }
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(message)) if !message.is_close() => {}
                _ => break,
            }
        }
    }

    tracing::info!("Deck view disconnected");
}

async fn push_view_update<S>(session: &HostSession, ws_sender: &mut S, key: &str) -> bool
where
    S: Sink<Message> + Unpin,
{
    let value = match key {
        QUIZ_RESULTS_KEY => serde_json::to_value(session.snapshot().await),
        _ => match session.thoughts().await {
            Ok(thoughts) => serde_json::to_value(thoughts),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read thoughts for deck view");
                return true;
            }
        },
    };

    let payload = match value {
        Ok(value) => serde_json::json!({ "key": key, "value": value }),
        Err(e) => {
            tracing::error!(error = %e, key = %key, "Failed to encode deck view update");
            return true;
        }
    };

    ws_sender.send(Message::text(payload.to_string())).await.is_ok()
}
