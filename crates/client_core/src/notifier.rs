//! Transient failure notifications: one visible at a time, auto-expiring.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};

use crate::{error::ApiCallError, events::SessionEvent};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(8);

pub const MISSING_CREDENTIALS_HINT: &str =
    "API key not configured: add your LLM API key to the interview server's .env file and restart it";

const CREDENTIAL_VOCABULARY: &[&str] = &["authorization", "api key", "auth", "credential"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
}

#[derive(Default)]
struct NotifierState {
    current: Option<Notification>,
    expiry: Option<JoinHandle<()>>,
}

pub struct Notifier {
    state: Arc<Mutex<NotifierState>>,
    next_id: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl Notifier {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NotifierState::default())),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Shows `message`, replacing whatever is visible, and schedules its expiry.
    pub async fn notify(&self, message: impl Into<String>) -> u64 {
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            message: message.into(),
        };
        let id = notification.id;

        let mut state = self.state.lock().await;
        if let Some(expiry) = state.expiry.take() {
            expiry.abort();
        }
        if let Some(previous) = state.current.take() {
            let _ = self
                .events
                .send(SessionEvent::NotificationDismissed { id: previous.id });
        }
        state.current = Some(notification.clone());
        let _ = self.events.send(SessionEvent::NotificationShown(notification));

        let shared = self.state.clone();
        let events = self.events.clone();
        state.expiry = Some(tokio::spawn(async move {
            tokio::time::sleep(NOTIFICATION_TTL).await;
            let mut state = shared.lock().await;
            if state.current.as_ref().is_some_and(|current| current.id == id) {
                state.current = None;
                state.expiry = None;
                let _ = events.send(SessionEvent::NotificationDismissed { id });
            }
        }));

        id
    }

    /// Manual dismissal. Returns false if `id` is no longer the visible notification.
    pub async fn dismiss(&self, id: u64) -> bool {
        let mut state = self.state.lock().await;
        if !state.current.as_ref().is_some_and(|current| current.id == id) {
            return false;
        }
        state.current = None;
        if let Some(expiry) = state.expiry.take() {
            expiry.abort();
        }
        let _ = self.events.send(SessionEvent::NotificationDismissed { id });
        true
    }

    pub async fn current(&self) -> Option<Notification> {
        self.state.lock().await.current.clone()
    }
}

/// Text shown when starting a session fails.
///
/// A structured auth code from the server selects the configuration hint. Without
/// one, the detail text is scanned for credential vocabulary. That scan is plain
/// substring matching on free text: it can misfire on unrelated wording and miss
/// rephrased server errors.
pub fn start_failure_message(err: &ApiCallError) -> String {
    if err.code().is_some_and(|code| code.is_auth()) {
        return MISSING_CREDENTIALS_HINT.to_string();
    }

    let detail = err.to_string();
    if mentions_credentials(&detail) {
        MISSING_CREDENTIALS_HINT.to_string()
    } else {
        detail
    }
}

fn mentions_credentials(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    CREDENTIAL_VOCABULARY.iter().any(|word| lower.contains(word))
}
