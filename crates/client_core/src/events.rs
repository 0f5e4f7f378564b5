//! Events published to whatever view is bound to a session.

use shared::domain::{Phase, Plan, SessionId};

use crate::{
    chat::TranscriptEntry, code_runner::CodeOutput, error::Control, notifier::Notification,
    EvaluationReport,
};

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SessionStarted {
        session_id: SessionId,
        plan: Plan,
    },
    PhaseChanged(Phase),
    TimerTick {
        elapsed_seconds: u64,
        display: String,
    },
    TranscriptReplaced(Vec<TranscriptEntry>),
    MessageAppended(TranscriptEntry),
    CodeOutput(CodeOutput),
    ControlState {
        control: Control,
        busy: bool,
    },
    NotificationShown(Notification),
    NotificationDismissed {
        id: u64,
    },
    ScorecardReady(EvaluationReport),
    SessionReset,
}
