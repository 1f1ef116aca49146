//! Human-in-the-loop gating, cancellation, and restart recovery.

mod common;

use common::*;
use orchestrator::OrchestratorError;
use serde_json::json;

const GATED: &str = r#"{
    "dag_id": "gated",
    "nodes": [
        {"node_id": "a", "node_type": "tool",
         "config": {"tool_name": "echo", "input": {"msg": "before gate"}},
         "dependencies": []},
        {"node_id": "h", "node_type": "human_in_loop",
         "config": {"message": "Ship it?"}, "dependencies": ["a"]},
        {"node_id": "b", "node_type": "tool",
         "config": {"tool_name": "echo", "input": {}}, "dependencies": ["h"]}
    ]
}"#;

#[tokio::test]
async fn test_hitl_approval_resumes_workflow() {
    let harness = harness().await;

    let workflow_id = harness
        .orchestrator
        .start_workflow("gated", "s", "u", graph_from(GATED))
        .await
        .unwrap();

    let request = wait_for_pending_hitl(&harness, &workflow_id).await;
    assert_eq!(request.node_id, "h");
    assert_eq!(request.message.as_deref(), Some("Ship it?"));

    // Parked: the workflow is running, the gate is waiting, and the
    // downstream node has not started.
    let status = harness
        .orchestrator
        .get_workflow_status(&workflow_id)
        .await
        .unwrap();
    assert_eq!(status.workflow.status, "running");
    let gate = status.nodes.iter().find(|n| n.node_id == "h").unwrap();
    assert_eq!(gate.status, "waiting_hitl");
    let after = status.nodes.iter().find(|n| n.node_id == "b").unwrap();
    assert_eq!(after.status, "pending");
    let log = events(&harness, &workflow_id).await;
    assert!(log.iter().all(|e| e.event_type != "node_started"
        || e.data_value()["node_id"] != json!("b")));

    let approved = harness
        .orchestrator
        .approve_hitl(&workflow_id, &request.request_id, "alice", "looks good")
        .await
        .unwrap();
    assert!(approved);

    let status = wait_for_terminal(&harness, &workflow_id).await;
    assert_eq!(status.workflow.status, "completed");

    let gate = status.nodes.iter().find(|n| n.node_id == "h").unwrap();
    let result = gate.result_value().unwrap();
    assert_eq!(result["approved"], true);
    assert_eq!(result["response"], "looks good");

    let log = events(&harness, &workflow_id).await;
    let requested = event_position(&log, "hitl_requested", Some("h"));
    let approved_at = event_position(&log, "hitl_approved", Some("h"));
    let b_started = event_position(&log, "node_started", Some("b"));
    assert!(requested < approved_at);
    assert!(approved_at < b_started);
}

#[tokio::test]
async fn test_hitl_rejection_fails_workflow() {
    let harness = harness().await;

    let workflow_id = harness
        .orchestrator
        .start_workflow("gated", "s", "u", graph_from(GATED))
        .await
        .unwrap();

    let request = wait_for_pending_hitl(&harness, &workflow_id).await;
    let rejected = harness
        .orchestrator
        .reject_hitl(&workflow_id, &request.request_id, "alice", "nope")
        .await
        .unwrap();
    assert!(rejected);

    let status = wait_for_terminal(&harness, &workflow_id).await;
    assert_eq!(status.workflow.status, "failed");
    assert!(status
        .workflow
        .error
        .unwrap()
        .contains("HITL rejected: nope"));

    // The downstream node never started.
    let after = status.nodes.iter().find(|n| n.node_id == "b").unwrap();
    assert_eq!(after.status, "pending");

    let log = events(&harness, &workflow_id).await;
    assert!(log.iter().any(|e| e.event_type == "hitl_rejected"));
    assert!(log.iter().any(|e| e.event_type == "workflow_failed"));
}

#[tokio::test]
async fn test_hitl_approval_is_idempotent() {
    let harness = harness().await;

    // Two independent gates keep the workflow parked after the first
    // approval, so the repeat call is observable.
    let graph = graph_from(
        r#"{
            "dag_id": "double-gated",
            "nodes": [
                {"node_id": "h1", "node_type": "human_in_loop",
                 "config": {"message": "one"}, "dependencies": []},
                {"node_id": "h2", "node_type": "human_in_loop",
                 "config": {"message": "two"}, "dependencies": []}
            ]
        }"#,
    );

    let workflow_id = harness
        .orchestrator
        .start_workflow("double-gated", "s", "u", graph)
        .await
        .unwrap();

    let first = wait_for_pending_hitl(&harness, &workflow_id).await;
    assert!(harness
        .orchestrator
        .approve_hitl(&workflow_id, &first.request_id, "alice", "yes")
        .await
        .unwrap());

    let log_before = events(&harness, &workflow_id).await;
    // Repeat approval: prior outcome, no new events.
    assert!(harness
        .orchestrator
        .approve_hitl(&workflow_id, &first.request_id, "bob", "again")
        .await
        .unwrap());
    // A late rejection of the same request reports the approval.
    assert!(!harness
        .orchestrator
        .reject_hitl(&workflow_id, &first.request_id, "bob", "too late")
        .await
        .unwrap());
    let log_after = events(&harness, &workflow_id).await;
    assert_eq!(log_before.len(), log_after.len());

    // The request row still shows the first responder.
    let request = orchestrator::db::repositories::HitlRepository::get_by_request_id(
        &harness.pool,
        &first.request_id,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(request.responded_by.as_deref(), Some("alice"));

    // Approve the remaining gate to finish.
    let second = wait_for_pending_hitl(&harness, &workflow_id).await;
    harness
        .orchestrator
        .approve_hitl(&workflow_id, &second.request_id, "alice", "yes")
        .await
        .unwrap();
    let status = wait_for_terminal(&harness, &workflow_id).await;
    assert_eq!(status.workflow.status, "completed");
}

#[tokio::test]
async fn test_hitl_calls_rejected_for_inactive_workflow() {
    let harness = harness().await;

    let workflow_id = harness
        .orchestrator
        .start_workflow("gated", "s", "u", graph_from(GATED))
        .await
        .unwrap();

    let request = wait_for_pending_hitl(&harness, &workflow_id).await;
    harness.orchestrator.cancel_workflow(&workflow_id).await.unwrap();

    // The request is still pending but the workflow is gone from the
    // active map.
    let err = harness
        .orchestrator
        .approve_hitl(&workflow_id, &request.request_id, "alice", "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::WorkflowNotActive(_)));
}

#[tokio::test]
async fn test_cancel_stops_workflow_without_events() {
    let harness = harness().await;

    let workflow_id = harness
        .orchestrator
        .start_workflow("gated", "s", "u", graph_from(GATED))
        .await
        .unwrap();
    wait_for_pending_hitl(&harness, &workflow_id).await;

    let log_before = events(&harness, &workflow_id).await;
    assert!(harness.orchestrator.cancel_workflow(&workflow_id).await.unwrap());
    // Cancelling twice is a no-op.
    assert!(!harness.orchestrator.cancel_workflow(&workflow_id).await.unwrap());

    let status = harness
        .orchestrator
        .get_workflow_status(&workflow_id)
        .await
        .unwrap();
    assert_eq!(status.workflow.status, "failed");
    assert_eq!(status.workflow.error.as_deref(), Some("cancelled"));

    // No events after the cancellation point.
    let log_after = events(&harness, &workflow_id).await;
    assert_eq!(log_before.len(), log_after.len());
}

#[tokio::test]
async fn test_unknown_request_and_workflow_errors() {
    let harness = harness().await;

    let workflow_id = harness
        .orchestrator
        .start_workflow("gated", "s", "u", graph_from(GATED))
        .await
        .unwrap();
    wait_for_pending_hitl(&harness, &workflow_id).await;

    let err = harness
        .orchestrator
        .approve_hitl(&workflow_id, "no-such-request", "alice", "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::RequestNotFound(_)));

    let err = harness
        .orchestrator
        .get_workflow_status("no-such-workflow")
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::WorkflowNotFound(_)));
}

#[tokio::test]
async fn test_recover_on_startup_fails_stale_running_workflows() {
    let harness = harness().await;

    // Simulate a workflow left running by a crashed process: a row with
    // no live driver.
    orchestrator::db::repositories::WorkflowRepository::create_with_nodes(
        &harness.pool,
        "stale-1",
        "dag",
        "s",
        "u",
        "Stale",
        "",
        "{}",
        &[],
    )
    .await
    .unwrap();

    let recovered = harness.orchestrator.recover_on_startup().await.unwrap();
    assert_eq!(recovered, vec!["stale-1".to_string()]);

    let status = harness
        .orchestrator
        .get_workflow_status("stale-1")
        .await
        .unwrap();
    assert_eq!(status.workflow.status, "failed");
    assert_eq!(
        status.workflow.error.as_deref(),
        Some("orchestrator restart")
    );

    let log = events(&harness, "stale-1").await;
    assert!(log.iter().any(|e| e.event_type == "workflow_failed"));
}
