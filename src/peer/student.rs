use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::channel::{ChannelEvent, PeerChannel};
use super::protocol::PeerMessage;
use super::room::RoomCode;
use super::status::Status;
use crate::activity::{SentimentAnalyzer, Thought, ThoughtClock};
use crate::quiz::{QuizAnswer, QuizAnswerKey, QuizStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// Not yet open; outgoing messages are queued
    Connecting,
    Open,
    /// Closed after being open; outgoing messages are dropped
    Closed,
}

/// What an incoming event changed, for the UI to react to
#[derive(Debug, Clone, PartialEq)]
pub enum StudentUpdate {
    Connected { flushed: usize },
    StatsUpdated,
    QuizConfigured,
    Disconnected,
    Failed(Status),
    Ignored,
}

/// Class-wide result for one question as seen by a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassResult {
    /// No statistics received from the host yet
    Unknown,
    NoData,
    PercentCorrect(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub question: u32,
    pub mine: Option<bool>,
    pub class: ClassResult,
}

/// One student's side of a room.
///
/// Messages submitted before the channel first opens are queued and flushed
/// in order on open. Answers are graded locally against the key the host
/// sends; without a key every answer counts as incorrect.
pub struct StudentSession {
    room_code: RoomCode,
    channel: Arc<dyn PeerChannel>,
    lifecycle: Lifecycle,
    outbox: VecDeque<PeerMessage>,
    answer_key: Option<QuizAnswerKey>,
    my_answers: BTreeMap<u32, bool>,
    class_stats: Option<QuizStats>,
    question_count: u32,
    status: Status,
    analyzer: SentimentAnalyzer,
    clock: ThoughtClock,
}

impl StudentSession {
    pub fn new(room_code: RoomCode, channel: Arc<dyn PeerChannel>, question_count: u32) -> Self {
        let status = Status::connecting(&room_code);
        tracing::info!(room_code = %room_code, "{}", status);

        Self {
            room_code,
            channel,
            lifecycle: Lifecycle::Connecting,
            outbox: VecDeque::new(),
            answer_key: None,
            my_answers: BTreeMap::new(),
            class_stats: None,
            question_count,
            status,
            analyzer: SentimentAnalyzer::new(),
            clock: ThoughtClock::new(),
        }
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    pub fn answer_key(&self) -> Option<&QuizAnswerKey> {
        self.answer_key.as_ref()
    }

    pub fn class_stats(&self) -> Option<&QuizStats> {
        self.class_stats.as_ref()
    }

    pub fn my_answer(&self, question: u32) -> Option<bool> {
        self.my_answers.get(&question).copied()
    }

    /// Messages not yet handed to the channel
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    pub fn on_event(&mut self, event: ChannelEvent) -> StudentUpdate {
        match event {
            ChannelEvent::Open => {
                self.lifecycle = Lifecycle::Open;
                self.status = Status::success("Connected to Instructor");
                tracing::info!(room_code = %self.room_code, "Connected to host");
                let flushed = self.flush();
                StudentUpdate::Connected { flushed }
            }
            ChannelEvent::Data(message) => self.on_message(message),
            ChannelEvent::Close => {
                self.lifecycle = Lifecycle::Closed;
                self.status = Status::error("Disconnected from host");
                tracing::warn!(room_code = %self.room_code, "Disconnected from host");
                StudentUpdate::Disconnected
            }
            ChannelEvent::Error(error) => {
                self.status = Status::from_peer_error(&self.room_code, &error);
                tracing::error!(room_code = %self.room_code, error = %error, "Peer error");
                StudentUpdate::Failed(self.status.clone())
            }
        }
    }

    fn on_message(&mut self, message: PeerMessage) -> StudentUpdate {
        match message {
            PeerMessage::StatsUpdate(stats) => {
                self.class_stats = Some(stats);
                StudentUpdate::StatsUpdated
            }
            PeerMessage::QuizConfig(key) => {
                tracing::info!(entries = key.len(), "Quiz configuration received");
                self.answer_key = Some(key);
                StudentUpdate::QuizConfigured
            }
            other => {
                tracing::debug!(kind = other.kind(), "Ignoring student-bound message");
                StudentUpdate::Ignored
            }
        }
    }

    /// Score and send a thought. Blank text sends nothing.
    pub fn submit_thought(&mut self, text: &str) -> Option<Thought> {
        let thought = Thought::compose(text, &self.analyzer, &self.clock)?;
        self.send(PeerMessage::Thought(thought.clone()));
        Some(thought)
    }

    /// Grade an answer locally, remember it and send it. Returns the grade.
    pub fn submit_answer(&mut self, question: u32, answer: &str) -> bool {
        let grade = self
            .answer_key
            .as_ref()
            .and_then(|key| key.grade(question, answer));

        let is_correct = match grade {
            Some(is_correct) => is_correct,
            None => {
                tracing::warn!(question, "Quiz answer key not loaded yet, grading as incorrect");
                false
            }
        };

        self.my_answers.insert(question, is_correct);
        self.send(PeerMessage::Quiz(QuizAnswer::new(question, is_correct)));
        is_correct
    }

    /// The student's own results next to the class statistics
    pub fn results(&self) -> Vec<ResultRow> {
        (1..=self.question_count)
            .map(|question| {
                let class = match &self.class_stats {
                    None => ClassResult::Unknown,
                    Some(stats) => match stats.question(question).and_then(|t| t.percent_correct()) {
                        Some(percent) => ClassResult::PercentCorrect(percent),
                        None if stats.question(question).is_some() => ClassResult::NoData,
                        None => ClassResult::Unknown,
                    },
                };

                ResultRow {
                    question,
                    mine: self.my_answer(question),
                    class,
                }
            })
            .collect()
    }

    fn send(&mut self, message: PeerMessage) {
        match self.lifecycle {
            Lifecycle::Connecting => {
                tracing::debug!(kind = message.kind(), "Connection not ready, queuing message");
                self.outbox.push_back(message);
            }
            Lifecycle::Open if !self.outbox.is_empty() => {
                // an interrupted flush left messages behind; keep submission order
                self.outbox.push_back(message);
                self.flush();
            }
            Lifecycle::Open => {
                if let Err(e) = self.channel.send(&message) {
                    tracing::warn!(kind = message.kind(), error = %e, "Dropped message");
                }
            }
            Lifecycle::Closed => {
                tracing::warn!(kind = message.kind(), "Channel closed, dropping message");
            }
        }
    }

    fn flush(&mut self) -> usize {
        let mut flushed = 0;
        while let Some(message) = self.outbox.pop_front() {
            if let Err(e) = self.channel.send(&message) {
                tracing::warn!(
                    kind = message.kind(),
                    pending = self.outbox.len() + 1,
                    error = %e,
                    "Flush interrupted, keeping queue"
                );
                self.outbox.push_front(message);
                break;
            }
            flushed += 1;
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::channel::{LocalChannel, PeerError};
    use crate::quiz::Tally;
    use crate::peer::status::StatusLevel;
    use tokio::sync::mpsc;

    fn student() -> (StudentSession, Arc<LocalChannel>, mpsc::UnboundedReceiver<PeerMessage>) {
        let (channel, rx) = LocalChannel::new("tcu-deck-AB12");
        let session = StudentSession::new("AB12".parse().unwrap(), channel.clone(), 3);
        (session, channel, rx)
    }

    fn open(session: &mut StudentSession, channel: &LocalChannel) -> StudentUpdate {
        channel.set_open(true);
        session.on_event(ChannelEvent::Open)
    }

    #[test]
    fn test_queue_flushes_in_order_once() {
        let (mut session, channel, mut rx) = student();

        let thought = session.submit_thought("fun lesson").unwrap();
        session.submit_answer(1, "B");
        assert_eq!(session.pending(), 2);
        assert!(rx.try_recv().is_err());

        assert_eq!(open(&mut session, &channel), StudentUpdate::Connected { flushed: 2 });
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Thought(thought));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(1, false)));
        assert!(rx.try_recv().is_err());
        assert_eq!(session.pending(), 0);

        // a second open event must not resend anything
        assert_eq!(session.on_event(ChannelEvent::Open), StudentUpdate::Connected { flushed: 0 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_interrupted_flush_keeps_submission_order() {
        let (mut session, channel, mut rx) = student();
        let thought = session.submit_thought("fun lesson").unwrap();
        session.submit_answer(1, "B");

        // open reported while the transport still refuses sends
        assert_eq!(session.on_event(ChannelEvent::Open), StudentUpdate::Connected { flushed: 0 });
        assert_eq!(session.pending(), 2);

        session.submit_answer(2, "A");
        assert_eq!(session.pending(), 3);
        assert!(rx.try_recv().is_err());

        channel.set_open(true);
        session.submit_answer(3, "C");
        assert_eq!(session.pending(), 0);
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Thought(thought));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(1, false)));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(2, false)));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(3, false)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_grades_with_key() {
        let (mut session, channel, mut rx) = student();
        open(&mut session, &channel);

        let key = QuizAnswerKey::parse("1=B,2=A").unwrap();
        assert_eq!(
            session.on_event(ChannelEvent::Data(PeerMessage::QuizConfig(key))),
            StudentUpdate::QuizConfigured
        );

        assert!(session.submit_answer(1, "B"));
        assert!(!session.submit_answer(2, "C"));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(1, true)));
        assert_eq!(rx.try_recv().unwrap(), PeerMessage::Quiz(QuizAnswer::new(2, false)));
        assert_eq!(session.my_answer(1), Some(true));
        assert_eq!(session.my_answer(2), Some(false));
    }

    #[test]
    fn test_missing_key_grades_incorrect() {
        let (mut session, channel, _rx) = student();
        open(&mut session, &channel);
        assert!(!session.submit_answer(1, "B"));
        assert_eq!(session.my_answer(1), Some(false));
    }

    #[test]
    fn test_sends_after_close_are_dropped() {
        let (mut session, channel, mut rx) = student();
        open(&mut session, &channel);

        channel.set_open(false);
        assert_eq!(session.on_event(ChannelEvent::Close), StudentUpdate::Disconnected);
        assert_eq!(session.status().message, "Disconnected from host");

        session.submit_thought("still here");
        assert_eq!(session.pending(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_results_table() {
        let (mut session, channel, _rx) = student();
        open(&mut session, &channel);
        session.submit_answer(1, "A");

        let rows = session.results();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].mine, Some(false));
        assert_eq!(rows[0].class, ClassResult::Unknown);

        let mut stats = QuizStats::new(3);
        stats.record_answer(Some(1), true);
        stats.record_answer(Some(1), true);
        stats.record_answer(Some(1), false);
        session.on_event(ChannelEvent::Data(PeerMessage::StatsUpdate(stats)));

        let rows = session.results();
        assert_eq!(rows[0].class, ClassResult::PercentCorrect(67));
        assert_eq!(rows[1].class, ClassResult::NoData);
        assert_eq!(rows[1].mine, None);
        assert_eq!(session.class_stats().unwrap().total, Tally { correct: 2, incorrect: 1 });
    }

    #[test]
    fn test_status_messages() {
        let (mut session, channel, _rx) = student();
        assert_eq!(session.status().message, "Connecting to Room: AB12...");

        open(&mut session, &channel);
        assert_eq!(session.status().level, StatusLevel::Success);
        assert_eq!(session.status().message, "Connected to Instructor");

        let update = session.on_event(ChannelEvent::Error(PeerError::PeerUnavailable));
        assert!(matches!(update, StudentUpdate::Failed(_)));
        assert_eq!(
            session.status().message,
            "Host not found (Room: AB12). Is the slide deck open?"
        );
    }

    #[test]
    fn test_blank_thought_not_sent() {
        let (mut session, _channel, _rx) = student();
        assert!(session.submit_thought("  ").is_none());
        assert_eq!(session.pending(), 0);
    }
}
