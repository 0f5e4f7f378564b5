//! Terminal rendering of session events.

use client_core::{
    code_runner::{CodeOutput, OutputTone},
    EvaluationReport, SessionEvent, TranscriptEntry,
};
use shared::domain::{MessageRole, Plan};
use tokio::sync::broadcast::{self, error::RecvError};

const BAR_WIDTH: usize = 20;

pub async fn run(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(text) = format_event(&event) {
                    println!("{text}");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "renderer lagged behind session events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

pub fn format_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::SessionStarted { plan, .. } => Some(format_plan(plan)),
        SessionEvent::PhaseChanged(phase) => Some(format!("[phase] {}", phase.label())),
        SessionEvent::TranscriptReplaced(entries) => {
            let lines: Vec<_> = entries.iter().filter_map(format_entry).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        SessionEvent::MessageAppended(entry) => format_entry(entry),
        SessionEvent::CodeOutput(output) => Some(format_output(output)),
        SessionEvent::NotificationShown(notification) => Some(format!(
            "[!] {} (:dismiss to close)",
            notification.message
        )),
        SessionEvent::ScorecardReady(report) => Some(format_report(report)),
        SessionEvent::SessionReset => Some("Interview discarded.".to_string()),
        SessionEvent::TimerTick { .. }
        | SessionEvent::ControlState { .. }
        | SessionEvent::NotificationDismissed { .. } => None,
    }
}

// The user's own lines are already on screen.
fn format_entry(entry: &TranscriptEntry) -> Option<String> {
    match (entry.role(), entry.error) {
        (MessageRole::User, _) => None,
        (_, true) => Some(format!("Interviewer [failed] {}", entry.content())),
        (_, false) => Some(format!("Interviewer: {}", entry.content())),
    }
}

fn format_output(output: &CodeOutput) -> String {
    let tag = match output.tone() {
        OutputTone::Neutral => "code",
        OutputTone::Success => "code ok",
        OutputTone::Error => "code error",
    };
    format!("[{tag}] {}", output.text().trim_end())
}

pub fn format_plan(plan: &Plan) -> String {
    format!(
        "Duration: {} min | Difficulty: {} | Persona: {} | Topic: {} | AI policy: {}",
        plan.duration_minutes,
        plan.difficulty,
        capitalize(&plan.persona),
        plan.topic_hint,
        plan.ai_policy
    )
}

pub fn format_report(report: &EvaluationReport) -> String {
    let view = &report.scorecard;
    let mut lines = vec![
        report.header(),
        format!("Verdict: {} ({})", view.verdict, view.total_text),
    ];
    for row in &view.rows {
        lines.push(format!(
            "  {:<24} {:>5}  {}  {}",
            row.label,
            row.score_text,
            bar(row.percent),
            row.feedback
        ));
    }
    if !view.summary.is_empty() {
        lines.push(view.summary.clone());
    }
    lines.join("\n")
}

fn bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round();
    let filled = (filled.max(0.0) as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
