use std::sync::Arc;

use shared::domain::{InterviewConfig, Phase, Plan, SessionId};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod chat;
pub mod code_runner;
mod controls;
pub mod error;
pub mod events;
pub mod notifier;
pub mod scorecard;
mod session;
pub mod timer;
pub mod transport;

pub use chat::{ChatChannel, SendOutcome, TranscriptEntry};
pub use code_runner::{CodeOutput, CodeRunner, OutputTone};
pub use error::{ApiCallError, ClientError, Control, Operation, SessionStartError};
pub use events::SessionEvent;
pub use notifier::{Notification, Notifier};
pub use scorecard::{ScoreRow, ScorecardView};
pub use session::SessionTicket;
pub use timer::Timer;
pub use transport::{HttpInterviewApi, InterviewApi};

use controls::Controls;
use session::{Epoch, SessionContext};

/// Scorecard as displayed after evaluation, with the frozen interview duration.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub company: String,
    pub elapsed_seconds: u64,
    pub duration: String,
    pub scorecard: ScorecardView,
}

impl EvaluationReport {
    pub fn header(&self) -> String {
        format!("{} · Interview Duration: {}", self.company, self.duration)
    }
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub plan: Option<Plan>,
    pub phase: Phase,
    pub elapsed_seconds: u64,
    pub transcript: Vec<TranscriptEntry>,
    pub code_output: CodeOutput,
    pub report: Option<EvaluationReport>,
}

/// Owns the interview session and sequences chat, code runs, timing and evaluation.
pub struct SessionController {
    api: Arc<dyn InterviewApi>,
    context: Mutex<SessionContext>,
    epoch: Epoch,
    chat: ChatChannel,
    code_runner: CodeRunner,
    timer: Timer,
    notifier: Notifier,
    controls: Controls,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(api: Arc<dyn InterviewApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(events::EVENT_CHANNEL_CAPACITY);
        let epoch = Epoch::default();
        Arc::new(Self {
            chat: ChatChannel::new(api.clone(), epoch.clone(), events.clone()),
            code_runner: CodeRunner::new(api.clone(), epoch.clone(), events.clone()),
            timer: Timer::new(events.clone()),
            notifier: Notifier::new(events.clone()),
            controls: Controls::new(events.clone()),
            api,
            context: Mutex::new(SessionContext::default()),
            epoch,
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> Phase {
        self.context.lock().await.phase
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn is_busy(&self, control: Control) -> bool {
        self.controls.is_busy(control)
    }

    pub async fn current_notification(&self) -> Option<Notification> {
        self.notifier.current().await
    }

    pub async fn dismiss_notification(&self, id: u64) -> bool {
        self.notifier.dismiss(id).await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let context = self.context.lock().await.clone();
        SessionSnapshot {
            session_id: context.session_id,
            plan: context.plan,
            phase: context.phase,
            elapsed_seconds: self.timer.elapsed_seconds(),
            transcript: self.chat.transcript().await,
            code_output: self.code_runner.output().await,
            report: context.report,
        }
    }

    /// Starts a new session, replacing any previous one, and loads its opening transcript.
    pub async fn start(&self, config: InterviewConfig) -> Result<Plan, ClientError> {
        let config = config.validate().map_err(SessionStartError::from)?;
        let _guard = self.controls.acquire(Control::Start)?;

        let response = match self.api.start_session(&config).await {
            Ok(response) => response,
            Err(err) => {
                let message = notifier::start_failure_message(&err);
                warn!(error = %err, "failed to start interview session");
                self.notifier.notify(message.clone()).await;
                return Err(SessionStartError::Rejected {
                    message,
                    source: err,
                }
                .into());
            }
        };

        let ticket = {
            let mut context = self.context.lock().await;
            let generation = self.epoch.advance();
            *context = SessionContext::started(
                response.session_id.clone(),
                config,
                response.plan.clone(),
            );
            self.chat.clear().await;
            self.code_runner.clear().await;
            SessionTicket::new(response.session_id.clone(), generation)
        };

        info!(session_id = %ticket.session_id, "interview session started");
        let _ = self.events.send(SessionEvent::SessionStarted {
            session_id: ticket.session_id.clone(),
            plan: response.plan.clone(),
        });
        let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Question));

        self.timer.reset().await;
        self.timer.start().await;

        self.chat.load_history(&ticket).await;
        Ok(response.plan)
    }

    /// Sends a chat message. Blank text is a no-op.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ClientError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }
        let ticket = self.ticket().await?;
        let _guard = self.controls.acquire(Control::Send)?;

        let outcome = self.chat.send(&ticket, text).await;
        if let SendOutcome::Replied { phase: Some(phase) } = &outcome {
            self.adopt_declared_phase(&ticket, *phase).await;
        }
        Ok(outcome)
    }

    /// Runs code in the sandbox. Blank code is a no-op and returns `None`.
    pub async fn run_code(&self, code: &str) -> Result<Option<CodeOutput>, ClientError> {
        if code.trim().is_empty() {
            return Ok(None);
        }
        let ticket = self.ticket().await?;
        let _guard = self.controls.acquire(Control::RunCode)?;
        Ok(self.code_runner.execute(&ticket, code).await)
    }

    /// Ends the interview and fetches the scorecard.
    ///
    /// The timer is frozen before the request goes out and stays frozen if it
    /// fails; the phase then drops back to `coding` so evaluation can be retried.
    pub async fn evaluate(&self) -> Result<EvaluationReport, ClientError> {
        let ticket = self.ticket().await?;
        if self.phase().await == Phase::Completed {
            return Err(ClientError::AlreadyCompleted);
        }
        let _guard = self.controls.acquire(Control::Evaluate)?;

        self.begin_evaluation(&ticket).await?;

        let response = match self.api.evaluate(&ticket.session_id).await {
            Ok(response) => response,
            Err(err) => {
                if self.set_phase(&ticket, Phase::Coding).await {
                    warn!(session_id = %ticket.session_id, error = %err, "evaluation failed");
                    self.notifier.notify(format!("Evaluation error: {err}")).await;
                }
                return Err(ClientError::Evaluation(err));
            }
        };

        let elapsed_seconds = self.timer.elapsed_seconds();
        let mut context = self.context.lock().await;
        if !self.epoch.is_current(&ticket) {
            warn!(session_id = %ticket.session_id, "dropping scorecard for a session that was reset");
            return Err(ClientError::NoActiveSession);
        }

        let report = EvaluationReport {
            company: context
                .config
                .as_ref()
                .map(|config| config.company.clone())
                .unwrap_or_default(),
            elapsed_seconds,
            duration: timer::format_duration(elapsed_seconds),
            scorecard: scorecard::transform(&response.scorecard),
        };
        context.phase = Phase::Completed;
        context.report = Some(report.clone());
        drop(context);

        info!(
            session_id = %ticket.session_id,
            verdict = %report.scorecard.verdict,
            "interview evaluated"
        );
        let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Completed));
        let _ = self.events.send(SessionEvent::ScorecardReady(report.clone()));
        Ok(report)
    }

    /// Drops the session and returns to configuration. In-flight replies for the
    /// old session are discarded when they land.
    pub async fn reset(&self) {
        {
            let mut context = self.context.lock().await;
            self.epoch.advance();
            *context = SessionContext::default();
            self.chat.clear().await;
            self.code_runner.clear().await;
        }
        self.timer.reset().await;
        info!("interview session reset");
        let _ = self.events.send(SessionEvent::SessionReset);
        let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Planning));
    }

    async fn ticket(&self) -> Result<SessionTicket, ClientError> {
        let context = self.context.lock().await;
        let session_id = context
            .session_id
            .clone()
            .ok_or(ClientError::NoActiveSession)?;
        Ok(SessionTicket::new(session_id, self.epoch.current()))
    }

    /// Moves the ticket's session into `evaluating` and freezes its timer. A
    /// session replaced since the ticket was taken is left untouched.
    async fn begin_evaluation(&self, ticket: &SessionTicket) -> Result<(), ClientError> {
        let mut context = self.context.lock().await;
        if !self.epoch.is_current(ticket) {
            warn!(session_id = %ticket.session_id, "not evaluating a session that was replaced");
            return Err(ClientError::NoActiveSession);
        }
        context.phase = Phase::Evaluating;
        let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Evaluating));
        self.timer.stop().await;
        Ok(())
    }

    async fn set_phase(&self, ticket: &SessionTicket, phase: Phase) -> bool {
        let mut context = self.context.lock().await;
        if !self.epoch.is_current(ticket) {
            return false;
        }
        context.phase = phase;
        let _ = self.events.send(SessionEvent::PhaseChanged(phase));
        true
    }

    async fn adopt_declared_phase(&self, ticket: &SessionTicket, phase: Phase) {
        let mut context = self.context.lock().await;
        if !self.epoch.is_current(ticket) {
            return;
        }
        // Evaluation owns the phase once it has begun.
        if matches!(context.phase, Phase::Evaluating | Phase::Completed) {
            warn!(declared = %phase, current = %context.phase, "ignoring phase declared during evaluation");
            return;
        }
        if context.phase != phase {
            context.phase = phase;
            let _ = self.events.send(SessionEvent::PhaseChanged(phase));
        }
    }
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
pub(crate) mod fake_api;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
