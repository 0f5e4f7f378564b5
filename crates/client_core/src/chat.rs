//! Transcript cache and the chat request/reply exchange.

use std::sync::Arc;

use shared::domain::{Message, MessageRole, Phase};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use crate::{
    error::ApiCallError,
    events::SessionEvent,
    session::{Epoch, SessionTicket},
    transport::InterviewApi,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub message: Message,
    /// Synthetic reply standing in for a failed exchange.
    pub error: bool,
}

impl TranscriptEntry {
    pub fn role(&self) -> MessageRole {
        self.message.role
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }
}

impl From<Message> for TranscriptEntry {
    fn from(message: Message) -> Self {
        Self {
            message,
            error: false,
        }
    }
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Blank input; nothing was appended or sent.
    Skipped,
    /// The interviewer replied. `phase` is set when the reply declared a phase
    /// the client is willing to adopt.
    Replied { phase: Option<Phase> },
    /// The exchange failed and an error reply was appended.
    Failed(ApiCallError),
    /// The session ended while the request was in flight.
    Stale,
}

pub struct ChatChannel {
    api: Arc<dyn InterviewApi>,
    transcript: Mutex<Vec<TranscriptEntry>>,
    epoch: Epoch,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatChannel {
    pub(crate) fn new(
        api: Arc<dyn InterviewApi>,
        epoch: Epoch,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            api,
            transcript: Mutex::new(Vec::new()),
            epoch,
            events,
        }
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.transcript.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replaces the local transcript with the server's copy. Failures are logged
    /// and leave the transcript as it was.
    pub async fn load_history(&self, ticket: &SessionTicket) -> bool {
        let conversation = match self.api.fetch_session(&ticket.session_id).await {
            Ok(state) => state.conversation,
            Err(err) => {
                warn!(session_id = %ticket.session_id, error = %err, "failed to load conversation");
                return false;
            }
        };

        let mut transcript = self.transcript.lock().await;
        if !self.epoch.is_current(ticket) {
            return false;
        }
        *transcript = conversation.into_iter().map(TranscriptEntry::from).collect();
        let _ = self
            .events
            .send(SessionEvent::TranscriptReplaced(transcript.clone()));
        true
    }

    pub async fn send(&self, ticket: &SessionTicket, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Skipped;
        }

        if !self.append(ticket, Message::user(text).into()).await {
            return SendOutcome::Stale;
        }

        match self.api.post_message(&ticket.session_id, text).await {
            Ok(response) => {
                if !self.append(ticket, Message::assistant(response.reply).into()).await {
                    return SendOutcome::Stale;
                }
                SendOutcome::Replied {
                    phase: declared_phase(&response.phase),
                }
            }
            Err(err) => {
                let entry = TranscriptEntry {
                    message: Message::assistant(format!("Error: {err}")),
                    error: true,
                };
                if !self.append(ticket, entry).await {
                    return SendOutcome::Stale;
                }
                SendOutcome::Failed(err)
            }
        }
    }

    pub(crate) async fn clear(&self) {
        self.transcript.lock().await.clear();
    }

    async fn append(&self, ticket: &SessionTicket, entry: TranscriptEntry) -> bool {
        let mut transcript = self.transcript.lock().await;
        if !self.epoch.is_current(ticket) {
            return false;
        }
        transcript.push(entry.clone());
        let _ = self.events.send(SessionEvent::MessageAppended(entry));
        true
    }
}

/// Validates a phase string from a chat reply. Unknown values and phases the
/// client manages itself are logged and not adopted.
pub fn declared_phase(raw: &str) -> Option<Phase> {
    match raw.parse::<Phase>() {
        Ok(phase) if phase.is_server_declared() => Some(phase),
        Ok(phase) => {
            warn!(%phase, "ignoring client-managed phase declared by chat reply");
            None
        }
        Err(err) => {
            warn!(error = %err, "ignoring unknown phase in chat reply");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod tests;
