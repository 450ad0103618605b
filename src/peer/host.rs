use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::channel::{ChannelEvent, PeerChannel};
use super::protocol::PeerMessage;
use super::room::RoomCode;
use super::status::Status;
use crate::activity::{place_all, BubbleLayout, Container, SentimentAnalyzer, Thought, ThoughtClock};
use crate::error::Result;
use crate::quiz::{Attribution, QuizAnswer, QuizAnswerKey, QuizStats};
use crate::storage::{ClassStore, StorageEvent};

/// The instructor's side of a room.
///
/// Owns the class store, which is the only writer of quiz statistics, and
/// the set of student channels that receive broadcasts. Store mutations and
/// the broadcast that follows happen under one lock, so answers are applied
/// and announced in arrival order.
pub struct HostSession {
    room_code: RoomCode,
    answer_key: QuizAnswerKey,
    analyzer: SentimentAnalyzer,
    clock: ThoughtClock,
    store: Mutex<ClassStore>,
    channels: RwLock<HashMap<String, Arc<dyn PeerChannel>>>,
    status: RwLock<Status>,
    next_student: AtomicU64,
}

impl HostSession {
    pub fn new(room_code: RoomCode, answer_key: QuizAnswerKey, store: ClassStore) -> Arc<Self> {
        let status = Status::host_ready(&room_code);
        tracing::info!(
            room_code = %room_code,
            host_peer_id = %room_code.host_peer_id(),
            questions = store.question_count(),
            answer_key_entries = answer_key.len(),
            "{}",
            status
        );

        Arc::new(Self {
            room_code,
            answer_key,
            analyzer: SentimentAnalyzer::new(),
            clock: ThoughtClock::new(),
            store: Mutex::new(store),
            channels: RwLock::new(HashMap::new()),
            status: RwLock::new(status),
            next_student: AtomicU64::new(1),
        })
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn host_peer_id(&self) -> String {
        self.room_code.host_peer_id()
    }

    pub fn answer_key(&self) -> &QuizAnswerKey {
        &self.answer_key
    }

    pub async fn question_count(&self) -> u32 {
        self.store.lock().await.question_count()
    }

    pub async fn status(&self) -> Status {
        self.status.read().await.clone()
    }

    /// Fresh peer id for an incoming student connection
    pub fn next_student_id(&self) -> String {
        format!("student-{}", self.next_student.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a student channel. Nothing is sent until it reports open.
    pub async fn accept(&self, channel: Arc<dyn PeerChannel>) {
        let peer_id = channel.peer_id().to_string();
        let mut channels = self.channels.write().await;
        if channels.insert(peer_id.clone(), channel).is_some() {
            tracing::warn!(peer_id = %peer_id, "Replaced existing channel for peer");
        }
        tracing::info!(peer_id = %peer_id, room_code = %self.room_code, "Student connected");
    }

    pub async fn connected_peers(&self) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut peers: Vec<String> = channels.keys().cloned().collect();
        peers.sort();
        peers
    }

    pub async fn on_event(&self, peer_id: &str, event: ChannelEvent) {
        match event {
            ChannelEvent::Open => self.on_open(peer_id).await,
            ChannelEvent::Data(message) => self.on_message(peer_id, message).await,
            ChannelEvent::Close => self.disconnect(peer_id).await,
            ChannelEvent::Error(error) => {
                tracing::error!(peer_id = %peer_id, error = %error, "Student channel error");
                *self.status.write().await = Status::from_peer_error(&self.room_code, &error);
            }
        }
    }

    /// Forget a student channel; it gets no further broadcasts
    pub async fn disconnect(&self, peer_id: &str) {
        let removed = self.channels.write().await.remove(peer_id);
        if removed.is_some() {
            tracing::info!(peer_id = %peer_id, room_code = %self.room_code, "Student disconnected");
        }
    }

    /// Push the current statistics, then the answer key, to a newly opened
    /// channel. The store stays locked until both are sent, so an answer
    /// arriving meanwhile is broadcast after them.
    async fn on_open(&self, peer_id: &str) {
        let Some(channel) = self.channels.read().await.get(peer_id).cloned() else {
            tracing::warn!(peer_id = %peer_id, "Open event for unknown channel");
            return;
        };

        let store = self.store.lock().await;
        for message in [
            PeerMessage::StatsUpdate(store.snapshot()),
            PeerMessage::QuizConfig(self.answer_key.clone()),
        ] {
            if let Err(e) = channel.send(&message) {
                tracing::warn!(peer_id = %peer_id, kind = message.kind(), error = %e, "Dropped initial message");
            }
        }
        tracing::debug!(peer_id = %peer_id, "Sent stats and quiz config");
    }

    async fn on_message(&self, peer_id: &str, message: PeerMessage) {
        tracing::debug!(peer_id = %peer_id, kind = message.kind(), "Received peer message");

        let result = match message {
            PeerMessage::Thought(thought) => self.receive_thought(thought).await,
            PeerMessage::Quiz(answer) => self.receive_answer(answer).await.map(|_| ()),
            PeerMessage::StatsUpdate(_) | PeerMessage::QuizConfig(_) => {
                tracing::warn!(peer_id = %peer_id, "Ignoring host-only message sent by a student");
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(peer_id = %peer_id, error = %e, "Failed to apply peer message");
        }
    }

    /// Store a thought as received from a student
    pub async fn receive_thought(&self, thought: Thought) -> Result<()> {
        tracing::info!(thought_id = thought.id, score = thought.score, "Thought received");
        self.store.lock().await.append_thought(thought)
    }

    /// Count an answer and broadcast the new statistics
    pub async fn receive_answer(&self, answer: QuizAnswer) -> Result<Attribution> {
        let mut store = self.store.lock().await;
        let attribution = store.record_answer(answer.question, answer.is_correct);
        // the in-memory stats changed even when persisting failed
        self.broadcast(&PeerMessage::StatsUpdate(store.snapshot())).await;
        attribution
    }

    /// Instructor submits a thought from the deck itself
    pub async fn add_thought(&self, text: &str) -> Result<Option<Thought>> {
        let Some(thought) = Thought::compose(text, &self.analyzer, &self.clock) else {
            return Ok(None);
        };
        self.store.lock().await.append_thought(thought.clone())?;
        Ok(Some(thought))
    }

    /// Zero the statistics, clear the thoughts and tell every student
    pub async fn reset(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        store.reset()?;
        self.broadcast(&PeerMessage::StatsUpdate(store.snapshot())).await;
        Ok(())
    }

    pub async fn snapshot(&self) -> QuizStats {
        self.store.lock().await.snapshot()
    }

    pub async fn thoughts(&self) -> Result<Vec<Thought>> {
        self.store.lock().await.thoughts()
    }

    pub async fn bubbles(&self, container: Container) -> Result<Vec<BubbleLayout>> {
        Ok(place_all(&self.thoughts().await?, container))
    }

    /// Re-read the store after it was changed elsewhere
    pub async fn reload(&self) {
        self.store.lock().await.reload();
    }

    pub async fn subscribe_storage(&self) -> broadcast::Receiver<StorageEvent> {
        self.store.lock().await.subscribe()
    }

    pub async fn stored_value(&self, key: &str) -> Result<Option<String>> {
        self.store.lock().await.raw(key)
    }

    /// Send to every open channel. Closed channels are skipped and a failed
    /// send does not stop delivery to the rest. Returns the number reached.
    pub async fn broadcast(&self, message: &PeerMessage) -> usize {
        let channels = self.channels.read().await;
        let mut delivered = 0;

        for (peer_id, channel) in channels.iter() {
            if !channel.is_open() {
                tracing::debug!(peer_id = %peer_id, kind = message.kind(), "Skipping closed channel");
                continue;
            }
            match channel.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(peer_id = %peer_id, kind = message.kind(), error = %e, "Broadcast send failed");
                }
            }
        }

        delivered
    }
}
