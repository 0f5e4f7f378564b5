//! Session identity and the generation counter that fences off dead sessions.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{InterviewConfig, Phase, Plan, SessionId};

use crate::EvaluationReport;

/// Handle to the session an operation was issued for.
///
/// Responses are only applied while the ticket's generation is still current,
/// so a reply that lands after `reset()` or a newer `start()` is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session_id: SessionId,
    generation: u64,
}

impl SessionTicket {
    pub(crate) fn new(session_id: SessionId, generation: u64) -> Self {
        Self {
            session_id,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Epoch(Arc<AtomicU64>);

impl Epoch {
    pub(crate) fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.current() == ticket.generation
    }
}

/// Everything the controller knows about the live session. Replaced wholesale
/// on start and reset, never patched field by field.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionContext {
    pub(crate) session_id: Option<SessionId>,
    pub(crate) config: Option<InterviewConfig>,
    pub(crate) plan: Option<Plan>,
    pub(crate) phase: Phase,
    pub(crate) report: Option<EvaluationReport>,
}

impl SessionContext {
    pub(crate) fn started(session_id: SessionId, config: InterviewConfig, plan: Plan) -> Self {
        Self {
            session_id: Some(session_id),
            config: Some(config),
            plan: Some(plan),
            phase: Phase::Question,
            report: None,
        }
    }
}
