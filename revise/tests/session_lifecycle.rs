//! Session-level tests driving the controller through full scenarios with
//! scripted collaborators: first generation, feedback, navigation, branching,
//! rejections and persistence failures.

use revise::controller::{Controller, ControllerError, Persisted, SessionOptions, SubmitOutcome};
use revise::core::label::LabelPolicy;
use revise::core::types::{Direction, Mode};
use revise::io::generator::GenerateRequest;
use revise::test_support::{
    RecordingStore, SavedArtifact, ScriptedGenerator, ScriptedResponse, html_response,
    html_response_with_usage, rejection, server_error,
};

fn session(responses: Vec<ScriptedResponse>) -> Controller<ScriptedGenerator, RecordingStore> {
    session_with(responses, LabelPolicy::Derived)
}

fn session_with(
    responses: Vec<ScriptedResponse>,
    labels: LabelPolicy,
) -> Controller<ScriptedGenerator, RecordingStore> {
    Controller::new(
        ScriptedGenerator::new(responses),
        RecordingStore::new(),
        SessionOptions {
            session_id: Some("sess".to_string()),
            labels,
        },
    )
}

fn appended(outcome: SubmitOutcome) -> revise::controller::Appended {
    match outcome {
        SubmitOutcome::Appended(appended) => appended,
        other => panic!("expected appended version, got {other:?}"),
    }
}

fn labels(controller: &Controller<ScriptedGenerator, RecordingStore>) -> Vec<String> {
    controller
        .snapshot()
        .history
        .versions()
        .iter()
        .map(|v| v.version_label.clone())
        .collect()
}

fn htmls(controller: &Controller<ScriptedGenerator, RecordingStore>) -> Vec<String> {
    controller
        .snapshot()
        .history
        .versions()
        .iter()
        .map(|v| v.html.clone())
        .collect()
}

#[tokio::test]
async fn first_generation_creates_version_one_and_switches_mode() {
    let controller = session(vec![html_response_with_usage(
        "<button>Go</button>",
        0.5,
        1000,
    )]);

    let added = appended(controller.submit("a red button").await.expect("generate"));

    assert_eq!(added.index, 0);
    assert_eq!(added.version.version_label, "1");
    assert_eq!(added.version.feedback, "");
    assert_eq!(added.version.session_id, "sess");
    assert_eq!(added.persisted, Persisted::Saved);
    assert_eq!(
        added.version.usage.map(|u| u.summary()).as_deref(),
        Some("500ms • 2000 tokens/sec")
    );

    let state = controller.snapshot();
    assert_eq!(state.mode, Mode::Feedback);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history.cursor(), Some(0));
    assert_eq!(state.displayed_html, "<button>Go</button>");
    assert_eq!(state.query, "a red button");

    assert_eq!(
        controller.generator().requests(),
        vec![GenerateRequest::initial("a red button", "")]
    );
    assert_eq!(
        controller.store().saves(),
        vec![SavedArtifact::of(&added.version)]
    );

    let reference = controller.artifact_ref().expect("reference");
    assert_eq!(reference.session_id, "sess");
    assert_eq!(reference.version_label, "1");
}

#[tokio::test]
async fn feedback_attaches_to_source_version_and_appends_next() {
    let controller = session(vec![
        html_response("<button>Go</button>"),
        html_response("<button style=\"color:blue\">Go</button>"),
    ]);
    controller.submit("a red button").await.expect("generate");

    let added = appended(controller.submit("  make it blue ").await.expect("feedback"));

    let state = controller.snapshot();
    assert_eq!(state.history.len(), 2);
    assert_eq!(state.history.cursor(), Some(1));
    assert_eq!(
        state.history.get(0).map(|v| v.feedback.as_str()),
        Some("make it blue")
    );
    assert_eq!(added.version.version_label, "2");
    assert_eq!(added.version.feedback, "");
    assert_eq!(state.feedback_input, "");
    assert_eq!(state.displayed_html, added.version.html);

    let requests = controller.generator().requests();
    assert_eq!(
        requests[1],
        GenerateRequest::revision("<button>Go</button>", "make it blue")
    );
}

#[tokio::test]
async fn cursor_tracks_newest_version_after_every_success() {
    let controller = session(vec![
        html_response("v1"),
        html_response("v2"),
        html_response("v3"),
        html_response("v4"),
    ]);
    controller.submit("q").await.expect("generate");
    let state = controller.snapshot();
    assert_eq!(state.history.cursor(), Some(state.history.len() - 1));

    for (step, feedback) in ["one", "two", "three"].into_iter().enumerate() {
        if step == 1 {
            controller.navigate(Direction::Previous).expect("back");
        }
        controller.submit(feedback).await.expect("feedback");
        let state = controller.snapshot();
        assert_eq!(state.history.cursor(), Some(state.history.len() - 1));
    }
}

/// `[v0, v1, v2]` with the cursor on v1: feedback discards v2 and appends v3.
#[tokio::test]
async fn feedback_from_middle_branches_history() {
    let controller = session(vec![
        html_response("v0"),
        html_response("v1"),
        html_response("v2"),
        html_response("v3"),
    ]);
    controller.submit("start").await.expect("v0");
    controller.submit("first").await.expect("v1");
    controller.submit("second").await.expect("v2");

    let back = controller.navigate(Direction::Previous).expect("back to v1");
    assert_eq!(back.html, "v1");

    let added = appended(controller.submit("alternative").await.expect("v3"));

    assert_eq!(htmls(&controller), vec!["v0", "v1", "v3"]);
    assert_eq!(added.index, 2);
    assert_eq!(controller.snapshot().history.cursor(), Some(2));
    assert_eq!(
        controller.generator().requests()[3],
        GenerateRequest::revision("v1", "alternative")
    );
}

/// Labels come from the pre-truncation length, so a branch can reuse a label.
#[tokio::test]
async fn derived_labels_reflect_pre_truncation_length() {
    let controller = session(vec![
        html_response("v0"),
        html_response("v1"),
        html_response("v2"),
        html_response("branch"),
        html_response("after-branch"),
    ]);
    controller.submit("start").await.expect("v0");
    controller.submit("a").await.expect("v1");
    controller.submit("b").await.expect("v2");
    controller.navigate(Direction::Previous);
    controller.navigate(Direction::Previous);

    let branch = appended(controller.submit("from the top").await.expect("branch"));
    assert_eq!(branch.version.version_label, "4");
    assert_eq!(labels(&controller), vec!["1", "4"]);

    let next = appended(controller.submit("again").await.expect("after branch"));
    assert_eq!(next.version.version_label, "3");
    assert_eq!(labels(&controller), vec!["1", "4", "3"]);

    let saved: Vec<String> = controller
        .store()
        .saves()
        .into_iter()
        .map(|s| s.version_label)
        .collect();
    assert_eq!(saved, vec!["1", "2", "3", "4", "3"]);
}

#[tokio::test]
async fn monotonic_labels_survive_branching() {
    let controller = session_with(
        vec![
            html_response("v0"),
            html_response("v1"),
            html_response("v2"),
            html_response("v3"),
        ],
        LabelPolicy::Monotonic,
    );
    controller.submit("start").await.expect("v0");
    controller.submit("a").await.expect("v1");
    controller.submit("b").await.expect("v2");
    controller.navigate(Direction::Previous);
    controller.navigate(Direction::Previous);
    controller.submit("c").await.expect("v3");

    assert_eq!(labels(&controller), vec!["1", "4"]);
    let saved: Vec<u32> = controller
        .store()
        .saves()
        .iter()
        .map(|save| save.version_label.parse().expect("numeric label"))
        .collect();
    assert_eq!(saved, vec![1, 2, 3, 4]);
    assert!(saved.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn navigation_restores_html_and_feedback_without_requests() {
    let controller = session(vec![html_response("v0"), html_response("v1")]);
    controller.submit("start").await.expect("v0");
    controller.submit("tweak").await.expect("v1");
    let requests_before = controller.generator().requests().len();
    let history_before = controller.snapshot().history;

    let back = controller.navigate(Direction::Previous).expect("back");
    assert_eq!(back.html, "v0");
    let state = controller.snapshot();
    assert_eq!(state.displayed_html, "v0");
    assert_eq!(state.feedback_input, "tweak");

    assert!(controller.navigate(Direction::Previous).is_none());
    assert_eq!(controller.snapshot().history.cursor(), Some(0));

    controller.navigate(Direction::Next).expect("forward");
    assert!(controller.navigate(Direction::Next).is_none());
    let state = controller.snapshot();
    assert_eq!(state.history.cursor(), Some(1));
    assert_eq!(state.displayed_html, "v1");
    assert_eq!(state.feedback_input, "");

    assert_eq!(state.history.versions(), history_before.versions());
    assert_eq!(controller.generator().requests().len(), requests_before);
    assert_eq!(controller.store().saves().len(), 2);
}

#[tokio::test]
async fn navigation_never_returns_to_query_mode() {
    let controller = session(vec![html_response("v0"), html_response("v1")]);
    controller.submit("start").await.expect("v0");
    controller.submit("more").await.expect("v1");
    controller.navigate(Direction::Previous).expect("back");
    assert_eq!(controller.mode(), Mode::Feedback);
}

#[tokio::test]
async fn rejection_leaves_state_untouched() {
    let controller = session(vec![
        html_response("<p>v0</p>"),
        rejection("unsafe content", "policy"),
    ]);
    controller.submit("start").await.expect("v0");
    let before = controller.snapshot();

    let err = controller.generate("something else").await.unwrap_err();

    assert_eq!(
        err,
        ControllerError::Rejected {
            error: "unsafe content".to_string(),
            category: "policy".to_string(),
        }
    );
    let after = controller.snapshot();
    assert_eq!(after.history, before.history);
    assert_eq!(after.mode, before.mode);
    assert_eq!(after.displayed_html, before.displayed_html);
    assert_eq!(controller.store().saves().len(), 1);
}

#[tokio::test]
async fn rejected_first_query_stays_in_query_mode() {
    let controller = session(vec![rejection("unsafe content", "policy")]);
    let err = controller.submit("bad idea").await.unwrap_err();
    assert!(matches!(err, ControllerError::Rejected { .. }));

    let state = controller.snapshot();
    assert_eq!(state.mode, Mode::Query);
    assert!(state.history.is_empty());
    assert_eq!(state.displayed_html, "");
    assert_eq!(state.query, "bad idea");
    assert!(controller.artifact_ref().is_none());
}

#[tokio::test]
async fn failed_feedback_keeps_input_for_retry() {
    let controller = session(vec![
        html_response("v0"),
        server_error(500),
        html_response("v1"),
    ]);
    controller.submit("start").await.expect("v0");

    let err = controller.submit("make it pop").await.unwrap_err();
    assert!(matches!(err, ControllerError::Generation(_)));
    let state = controller.snapshot();
    assert_eq!(state.feedback_input, "make it pop");
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.displayed_html, "v0");

    let retry = appended(controller.submit(&state.feedback_input).await.expect("retry"));
    assert_eq!(retry.version.version_label, "2");
}

#[tokio::test]
async fn persistence_failure_keeps_version_and_reports_it() {
    let controller = Controller::new(
        ScriptedGenerator::new(vec![html_response("v0")]),
        RecordingStore::failing(),
        SessionOptions::default(),
    );

    let added = appended(controller.submit("start").await.expect("generate"));

    assert!(matches!(added.persisted, Persisted::Failed(ref reason) if reason.contains("503")));
    assert_eq!(controller.snapshot().history.len(), 1);
    assert_eq!(controller.mode(), Mode::Feedback);
}

#[tokio::test]
async fn overlapping_submission_is_rejected_while_in_flight() {
    let controller = Controller::new(
        ScriptedGenerator::new(vec![html_response("v0"), html_response("v1")]).gated(),
        RecordingStore::new(),
        SessionOptions::default(),
    );

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("start").await })
    };
    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }

    let err = controller.submit("again").await.unwrap_err();
    assert_eq!(err, ControllerError::Busy);
    assert_eq!(controller.generator().requests().len(), 1);

    controller.generator().release();
    let outcome = first.await.expect("join").expect("first submission");
    assert!(matches!(outcome, SubmitOutcome::Appended(_)));
    assert!(!controller.is_busy());

    controller.generator().release();
    controller.submit("again").await.expect("after settle");
    assert_eq!(controller.snapshot().history.len(), 2);
}

/// A refused submission does not overwrite the pending input, and text typed
/// during the request survives its completion.
#[tokio::test]
async fn busy_feedback_keeps_pending_input() {
    let controller = Controller::new(
        ScriptedGenerator::new(vec![html_response("v0"), html_response("v1")]).gated(),
        RecordingStore::new(),
        SessionOptions::default(),
    );
    controller.generator().release();
    controller.submit("start").await.expect("v0");

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("one").await })
    };
    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }

    let err = controller.submit("two").await.unwrap_err();
    assert_eq!(err, ControllerError::Busy);
    assert_eq!(controller.snapshot().feedback_input, "one");

    controller.set_input("two");
    controller.generator().release();
    pending.await.expect("join").expect("revision");

    let state = controller.snapshot();
    assert_eq!(state.feedback_input, "two");
    assert_eq!(state.history.get(0).map(|v| v.feedback.as_str()), Some("one"));
    assert_eq!(state.displayed_html, "v1");
}

/// Navigating while a revision is in flight does not move the branch point.
#[tokio::test]
async fn revision_branches_from_cursor_at_dispatch() {
    let controller = Controller::new(
        ScriptedGenerator::new(vec![
            html_response("v0"),
            html_response("v1"),
            html_response("v2"),
        ])
        .gated(),
        RecordingStore::new(),
        SessionOptions::default(),
    );
    controller.generator().release();
    controller.submit("start").await.expect("v0");
    controller.generator().release();
    controller.submit("one").await.expect("v1");

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("two").await })
    };
    while !controller.is_busy() {
        tokio::task::yield_now().await;
    }
    controller.navigate(Direction::Previous).expect("navigate while busy");

    controller.generator().release();
    pending.await.expect("join").expect("revision");

    assert_eq!(htmls(&controller), vec!["v0", "v1", "v2"]);
    assert_eq!(controller.snapshot().history.cursor(), Some(2));
    assert_eq!(controller.snapshot().displayed_html, "v2");
}
