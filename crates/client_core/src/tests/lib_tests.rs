use super::*;
use crate::fake_api::{
    execution, rejected, reply, sample_config, started, Call, FakeInterviewApi,
};
use shared::{
    domain::{Message, MessageRole},
    error::ErrorCode,
    protocol::SessionStateResponse,
};
use std::time::Duration;
use tokio::time::sleep;

fn controller(api: &Arc<FakeInterviewApi>) -> Arc<SessionController> {
    let api: Arc<dyn InterviewApi> = api.clone();
    SessionController::new(api)
}

async fn started_controller() -> (Arc<FakeInterviewApi>, Arc<SessionController>) {
    let api = FakeInterviewApi::new();
    let controller = controller(&api);
    controller.start(sample_config()).await.expect("start");
    (api, controller)
}

fn timer_displays(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<String> {
    let mut displays = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::TimerTick { display, .. } = event {
            displays.push(display);
        }
    }
    displays
}

#[tokio::test(start_paused = true)]
async fn start_enters_question_phase_and_runs_timer() {
    let api = FakeInterviewApi::new();
    let controller = controller(&api);
    let mut rx = controller.subscribe_events();
    assert_eq!(controller.phase().await, Phase::Planning);

    let plan = controller.start(sample_config()).await.expect("start");
    assert_eq!(plan.topic_hint, "hash maps");
    assert_eq!(controller.phase().await, Phase::Question);
    assert_eq!(controller.elapsed_seconds(), 0);

    sleep(Duration::from_millis(1_001)).await;
    assert_eq!(controller.elapsed_seconds(), 1);
    assert_eq!(timer_displays(&mut rx), vec!["00:00", "00:01"]);

    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.session_id,
        Some(SessionId("session-1".to_string()))
    );
    assert_eq!(snapshot.transcript.len(), 1);
    assert_eq!(snapshot.transcript[0].role(), MessageRole::Assistant);
    assert_eq!(snapshot.code_output, CodeOutput::Idle);
    assert_eq!(
        api.calls().await,
        vec![
            Call::Start(sample_config()),
            Call::Fetch(SessionId("session-1".to_string()))
        ]
    );
}

#[tokio::test]
async fn start_survives_history_load_failure() {
    let api = FakeInterviewApi::new();
    api.push_fetch(Err(rejected(Operation::FetchSession, "Session not found")))
        .await;
    let controller = controller(&api);

    controller.start(sample_config()).await.expect("start");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Question);
    assert!(snapshot.transcript.is_empty());
}

#[tokio::test]
async fn start_rejection_rewrites_credential_errors_and_notifies() {
    let api = FakeInterviewApi::new();
    api.push_start(Err(rejected(
        Operation::StartSession,
        "Failed to generate plan: Error code: 400 - API key not valid",
    )))
    .await;
    let controller = controller(&api);

    let err = controller
        .start(sample_config())
        .await
        .expect_err("start must fail");
    match err {
        ClientError::SessionStart(SessionStartError::Rejected { message, .. }) => {
            assert_eq!(message, notifier::MISSING_CREDENTIALS_HINT);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let notification = controller.current_notification().await.expect("notified");
    assert_eq!(notification.message, notifier::MISSING_CREDENTIALS_HINT);
    assert_eq!(controller.phase().await, Phase::Planning);
    assert!(controller.snapshot().await.session_id.is_none());
    assert!(!controller.is_busy(Control::Start));
}

#[tokio::test]
async fn start_rejection_uses_structured_code_when_present() {
    let api = FakeInterviewApi::new();
    api.push_start(Err(ApiCallError::rejected(
        Operation::StartSession,
        403,
        Some("planner refused"),
        Some(ErrorCode::Forbidden),
    )))
    .await;
    let controller = controller(&api);

    controller.start(sample_config()).await.expect_err("must fail");
    assert_eq!(
        controller.current_notification().await.map(|n| n.message),
        Some(notifier::MISSING_CREDENTIALS_HINT.to_string())
    );
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_request() {
    let api = FakeInterviewApi::new();
    let controller = controller(&api);

    let err = controller
        .start(InterviewConfig::new("  ", "SDE", "SDE1", "DSA"))
        .await
        .expect_err("blank company");
    assert!(matches!(
        err,
        ClientError::SessionStart(SessionStartError::InvalidConfig(_))
    ));
    assert!(api.calls().await.is_empty());
}

#[tokio::test]
async fn second_start_replaces_session_and_discards_state() {
    let (api, controller) = started_controller().await;
    api.push_execution(Ok(execution("1\n", "", false))).await;
    controller.send("first session").await.expect("send");
    controller.run_code("print(1)").await.expect("run");

    api.push_start(Ok(started("session-2"))).await;
    api.push_fetch(Ok(SessionStateResponse {
        conversation: vec![Message::assistant("New question")],
    }))
    .await;
    controller.start(sample_config()).await.expect("restart");

    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.session_id,
        Some(SessionId("session-2".to_string()))
    );
    assert_eq!(snapshot.phase, Phase::Question);
    assert_eq!(snapshot.code_output, CodeOutput::Idle);
    assert_eq!(snapshot.transcript.len(), 1);
    assert_eq!(snapshot.transcript[0].content(), "New question");
}

#[tokio::test]
async fn send_adopts_declared_phase() {
    let api = FakeInterviewApi::new();
    api.push_fetch(Ok(SessionStateResponse {
        conversation: Vec::new(),
    }))
    .await;
    api.push_message(Ok(reply("And the complexity?", "complexity")))
        .await;
    let controller = controller(&api);
    controller.start(sample_config()).await.expect("start");

    controller.send("I'd use a hash map").await.expect("send");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Complexity);
    let transcript: Vec<_> = snapshot
        .transcript
        .iter()
        .map(|entry| (entry.role(), entry.content().to_string()))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (MessageRole::User, "I'd use a hash map".to_string()),
            (MessageRole::Assistant, "And the complexity?".to_string()),
        ]
    );
}

#[tokio::test]
async fn send_ignores_unknown_and_client_managed_phases() {
    let (api, controller) = started_controller().await;
    api.push_message(Ok(reply("hm", "wrap_up"))).await;
    api.push_message(Ok(reply("bye", "completed"))).await;

    controller.send("one").await.expect("send");
    controller.send("two").await.expect("send");
    assert_eq!(controller.phase().await, Phase::Question);
    assert_eq!(controller.snapshot().await.transcript.len(), 5);
}

#[tokio::test]
async fn send_failure_does_not_touch_phase_or_code_output() {
    let (api, controller) = started_controller().await;
    api.push_execution(Ok(execution("ok\n", "", false))).await;
    controller.run_code("print('ok')").await.expect("run");
    api.push_message(Err(rejected(Operation::PostMessage, "Interviewer error: boom")))
        .await;

    let outcome = controller.send("hello").await.expect("send");
    assert!(matches!(outcome, SendOutcome::Failed(_)));

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Question);
    assert_eq!(snapshot.code_output, CodeOutput::Stdout("ok\n".to_string()));
    let last = snapshot.transcript.last().expect("error entry");
    assert!(last.error);
    assert_eq!(last.content(), "Error: Interviewer error: boom");
    assert!(!controller.is_busy(Control::Send));
}

#[tokio::test]
async fn operations_require_a_session() {
    let api = FakeInterviewApi::new();
    let controller = controller(&api);

    assert!(matches!(
        controller.send("hello").await,
        Err(ClientError::NoActiveSession)
    ));
    assert!(matches!(
        controller.run_code("print(1)").await,
        Err(ClientError::NoActiveSession)
    ));
    assert!(matches!(
        controller.evaluate().await,
        Err(ClientError::NoActiveSession)
    ));
    assert!(api.calls().await.is_empty());
}

#[tokio::test]
async fn blank_code_issues_no_request() {
    let (api, controller) = started_controller().await;
    let before = api.calls().await.len();

    assert_eq!(controller.run_code("").await.expect("no-op"), None);
    assert_eq!(api.calls().await.len(), before);
    assert_eq!(controller.snapshot().await.code_output, CodeOutput::Idle);
}

#[tokio::test]
async fn run_code_renders_stdout() {
    let (api, controller) = started_controller().await;
    api.push_execution(Ok(execution("1\n", "", false))).await;

    let output = controller
        .run_code("print(1)")
        .await
        .expect("run")
        .expect("rendered");
    assert_eq!(output.text(), "1\n");
    assert_eq!(output.tone(), OutputTone::Success);
}

#[tokio::test]
async fn same_control_is_gated_but_different_controls_overlap() {
    let (api, controller) = started_controller().await;
    let held_run = api.hold(Operation::ExecuteCode).await;
    api.push_execution(Ok(execution("done\n", "", false))).await;
    api.push_message(Ok(reply("noted", "coding"))).await;

    let run = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run_code("slow()").await }
    });
    held_run.entered().await;
    assert!(controller.is_busy(Control::RunCode));

    assert!(matches!(
        controller.run_code("again()").await,
        Err(ClientError::ControlBusy(Control::RunCode))
    ));
    let outcome = controller.send("while that runs...").await.expect("send");
    assert!(matches!(
        outcome,
        SendOutcome::Replied {
            phase: Some(Phase::Coding)
        }
    ));
    assert_eq!(controller.snapshot().await.code_output, CodeOutput::Running);

    held_run.release();
    let output = run.await.expect("join").expect("run");
    assert_eq!(output, Some(CodeOutput::Stdout("done\n".to_string())));
    assert!(!controller.is_busy(Control::RunCode));
    assert_eq!(controller.snapshot().await.transcript.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn evaluate_completes_and_transforms_scorecard() {
    let (api, controller) = started_controller().await;
    let mut rx = controller.subscribe_events();

    let report = controller.evaluate().await.expect("evaluate");
    assert_eq!(controller.phase().await, Phase::Completed);
    assert_eq!(report.scorecard.verdict, "Strong Hire");
    assert_eq!(report.scorecard.verdict_slug, "strong-hire");
    assert_eq!(report.scorecard.total_text, "18 / 20");
    assert_eq!(report.scorecard.rows.len(), 4);
    assert_eq!(report.header(), "Acme · Interview Duration: 0m 0s");
    assert_eq!(
        controller.snapshot().await.report.as_ref(),
        Some(&report)
    );
    assert!(api
        .calls()
        .await
        .contains(&Call::Evaluate(SessionId("session-1".to_string()))));

    let mut phases = Vec::new();
    let mut scorecard_ready = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            SessionEvent::PhaseChanged(phase) => phases.push(phase),
            SessionEvent::ScorecardReady(_) => scorecard_ready = true,
            _ => {}
        }
    }
    assert_eq!(phases, vec![Phase::Evaluating, Phase::Completed]);
    assert!(scorecard_ready);

    assert!(matches!(
        controller.evaluate().await,
        Err(ClientError::AlreadyCompleted)
    ));
}

#[tokio::test(start_paused = true)]
async fn evaluate_freezes_timer_before_response() {
    let (api, controller) = started_controller().await;
    sleep(Duration::from_millis(2_001)).await;
    assert_eq!(controller.elapsed_seconds(), 2);

    let held = api.hold(Operation::Evaluate).await;
    let task = tokio::spawn({
        let controller = controller.clone();
        async move { controller.evaluate().await }
    });
    held.entered().await;

    assert_eq!(controller.phase().await, Phase::Evaluating);
    assert!(controller.is_busy(Control::Evaluate));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(controller.elapsed_seconds(), 2);

    held.release();
    let report = task.await.expect("join").expect("evaluate");
    assert_eq!(report.elapsed_seconds, 2);
    assert_eq!(report.duration, "0m 2s");
    assert_eq!(controller.phase().await, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn evaluate_failure_reverts_to_coding_and_keeps_timer_stopped() {
    let (api, controller) = started_controller().await;
    sleep(Duration::from_millis(3_001)).await;
    api.push_evaluation(Err(rejected(
        Operation::Evaluate,
        "Evaluation error: model unavailable",
    )))
    .await;

    let err = controller.evaluate().await.expect_err("must fail");
    assert!(matches!(err, ClientError::Evaluation(_)));
    assert_eq!(controller.phase().await, Phase::Coding);
    assert!(!controller.is_busy(Control::Evaluate));

    let notification = controller.current_notification().await.expect("notified");
    assert_eq!(
        notification.message,
        "Evaluation error: Evaluation error: model unavailable"
    );

    sleep(Duration::from_secs(10)).await;
    assert_eq!(controller.elapsed_seconds(), 3);
    assert!(controller.current_notification().await.is_none());

    // A manual retry goes through.
    let report = controller.evaluate().await.expect("retry");
    assert_eq!(report.duration, "0m 3s");
    assert_eq!(controller.phase().await, Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn reset_returns_to_configuration() {
    let (api, controller) = started_controller().await;
    api.push_execution(Ok(execution("1\n", "", false))).await;
    controller.send("hi").await.expect("send");
    controller.run_code("print(1)").await.expect("run");
    sleep(Duration::from_millis(4_001)).await;

    controller.reset().await;
    let snapshot = controller.snapshot().await;
    assert!(snapshot.session_id.is_none());
    assert!(snapshot.plan.is_none());
    assert_eq!(snapshot.phase, Phase::Planning);
    assert_eq!(snapshot.elapsed_seconds, 0);
    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.code_output, CodeOutput::Idle);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(controller.elapsed_seconds(), 0);
    assert!(matches!(
        controller.send("anyone?").await,
        Err(ClientError::NoActiveSession)
    ));
}

#[tokio::test]
async fn reply_landing_after_reset_is_discarded() {
    let (api, controller) = started_controller().await;
    let held = api.hold(Operation::PostMessage).await;
    api.push_message(Ok(reply("late reply", "coding"))).await;

    let task = tokio::spawn({
        let controller = controller.clone();
        async move { controller.send("hello?").await }
    });
    held.entered().await;
    controller.reset().await;
    held.release();

    let outcome = task.await.expect("join").expect("send");
    assert!(matches!(outcome, SendOutcome::Stale));
    let snapshot = controller.snapshot().await;
    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.phase, Phase::Planning);
}

#[tokio::test(start_paused = true)]
async fn evaluation_for_a_replaced_session_leaves_the_new_one_running() {
    let (api, controller) = started_controller().await;
    let stale = controller.ticket().await.expect("ticket");

    api.push_start(Ok(started("session-2"))).await;
    controller.start(sample_config()).await.expect("restart");

    assert!(matches!(
        controller.begin_evaluation(&stale).await,
        Err(ClientError::NoActiveSession)
    ));
    assert_eq!(controller.phase().await, Phase::Question);

    sleep(Duration::from_millis(2_001)).await;
    assert_eq!(controller.elapsed_seconds(), 2);
    assert!(!api
        .calls()
        .await
        .iter()
        .any(|call| matches!(call, Call::Evaluate(_))));
}
