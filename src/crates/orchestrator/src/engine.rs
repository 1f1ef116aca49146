//! The workflow orchestrator: drivers, dispatch, and HITL gating.
//!
//! One driver task per workflow owns that workflow's in-memory graph.
//! Each loop iteration computes the ready set, dispatches the whole
//! batch concurrently, joins it, and re-evaluates. The driver suspends
//! only by parking at a human-in-the-loop node (the approval entry point
//! relaunches it) or by reaching a terminal state.
//!
//! A per-workflow async gate guarantees at most one live driver even
//! when approvals race; a relaunched driver that cannot take the gate
//! exits immediately.

use crate::agents::AgentRegistry;
use crate::db::models::{HitlRequest, Workflow, WorkflowNode};
use crate::db::repositories::{
    EventRepository, HitlRepository, NodeSeed, WorkflowNodeRepository, WorkflowRepository,
};
use crate::db::DatabasePool;
use crate::substitution::substitute_placeholders;
use crate::{OrchestratorError, Result};
use dagcore::{Graph, NodeKind, NodeStatus};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tooling::ToolRegistry;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Snapshot returned by `get_workflow_status`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkflowStatus {
    pub workflow: Workflow,
    pub nodes: Vec<WorkflowNode>,
}

struct ActiveWorkflow {
    graph: Arc<Mutex<Graph>>,
    driver_gate: Arc<AsyncMutex<()>>,
}

struct Inner {
    pool: DatabasePool,
    agents: Arc<AgentRegistry>,
    tools: Arc<ToolRegistry>,
    active: Mutex<HashMap<String, ActiveWorkflow>>,
    drivers: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Orchestrates workflow execution.
pub struct WorkflowOrchestrator {
    inner: Arc<Inner>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator over the shared store and registries.
    pub fn new(pool: DatabasePool, agents: Arc<AgentRegistry>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                agents,
                tools,
                active: Mutex::new(HashMap::new()),
                drivers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start a new workflow execution for a validated graph. Persists
    /// the workflow row and all node rows in one transaction, emits
    /// `workflow_started`, registers the live graph, and schedules the
    /// driver. Returns the fresh workflow id synchronously.
    pub async fn start_workflow(
        &self,
        dag_id: &str,
        session_id: &str,
        user_id: &str,
        graph: Graph,
    ) -> Result<String> {
        graph.validate()?;

        let workflow_id = Uuid::new_v4().to_string();
        let graph_json = graph.to_json()?;

        let seeds: Vec<NodeSeed> = graph
            .nodes
            .values()
            .map(|node| NodeSeed {
                node_id: node.node_id.clone(),
                node_type: node.kind.as_str().to_string(),
                agent_id: node.agent_id.clone(),
                config: node.config.to_string(),
            })
            .collect();

        WorkflowRepository::create_with_nodes(
            &self.inner.pool,
            &workflow_id,
            dag_id,
            session_id,
            user_id,
            &graph.name,
            &graph.description,
            &graph_json,
            &seeds,
        )
        .await?;

        EventRepository::insert(
            &self.inner.pool,
            &workflow_id,
            "workflow_started",
            &json!({ "dag_id": dag_id, "user_id": user_id }),
        )
        .await?;

        self.inner.active.lock().insert(
            workflow_id.clone(),
            ActiveWorkflow {
                graph: Arc::new(Mutex::new(graph)),
                driver_gate: Arc::new(AsyncMutex::new(())),
            },
        );

        info!("Started workflow {} for dag {}", workflow_id, dag_id);
        Inner::spawn_driver(&self.inner, &workflow_id);
        Ok(workflow_id)
    }

    /// Workflow row plus per-node rows.
    pub async fn get_workflow_status(&self, workflow_id: &str) -> Result<WorkflowStatus> {
        let workflow = WorkflowRepository::get_by_id(&self.inner.pool, workflow_id)
            .await?
            .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow_id.to_string()))?;
        let nodes =
            WorkflowNodeRepository::list_for_workflow(&self.inner.pool, workflow_id).await?;
        Ok(WorkflowStatus { workflow, nodes })
    }

    /// Pending HITL requests, optionally restricted to one workflow.
    pub async fn get_pending_hitl_requests(
        &self,
        workflow_id: Option<&str>,
    ) -> Result<Vec<HitlRequest>> {
        Ok(HitlRepository::list_pending(&self.inner.pool, workflow_id).await?)
    }

    /// Approve a pending HITL request: the owning node completes with
    /// `{approved: true, response}` and the driver is relaunched.
    /// Idempotent: repeating the call for a non-pending request returns
    /// the prior outcome without emitting events.
    pub async fn approve_hitl(
        &self,
        workflow_id: &str,
        request_id: &str,
        user_id: &str,
        response: &str,
    ) -> Result<bool> {
        let request = HitlRepository::get_by_request_id(&self.inner.pool, request_id)
            .await?
            .filter(|r| r.workflow_id == workflow_id)
            .ok_or_else(|| OrchestratorError::RequestNotFound(request_id.to_string()))?;

        // Idempotency first: an already-answered request reports its
        // prior outcome whether or not the workflow is still active.
        if !request.is_pending() {
            return Ok(request.status == "approved");
        }

        let active = self.inner.get_active(workflow_id).ok_or_else(|| {
            OrchestratorError::WorkflowNotActive(workflow_id.to_string())
        })?;

        if !HitlRepository::approve(&self.inner.pool, request_id, user_id, response).await? {
            // Lost a race with a concurrent responder; report what won.
            let current = HitlRepository::get_by_request_id(&self.inner.pool, request_id).await?;
            return Ok(matches!(current, Some(r) if r.status == "approved"));
        }

        let result = json!({ "approved": true, "response": response });
        WorkflowNodeRepository::mark_completed(
            &self.inner.pool,
            workflow_id,
            &request.node_id,
            &result.to_string(),
        )
        .await?;

        {
            let mut graph = active.graph.lock();
            if let Some(node) = graph.get_node_mut(&request.node_id) {
                node.status = NodeStatus::Completed;
                node.result = Some(result.clone());
            }
        }

        EventRepository::insert_if_running(
            &self.inner.pool,
            workflow_id,
            "hitl_approved",
            &json!({
                "node_id": request.node_id,
                "request_id": request_id,
                "user_id": user_id
            }),
        )
        .await?;

        info!("HITL request {} approved by {}", request_id, user_id);
        Inner::spawn_driver(&self.inner, workflow_id);
        Ok(true)
    }

    /// Reject a pending HITL request: the workflow fails with the reason
    /// carried through. Idempotent like `approve_hitl`.
    pub async fn reject_hitl(
        &self,
        workflow_id: &str,
        request_id: &str,
        user_id: &str,
        reason: &str,
    ) -> Result<bool> {
        let request = HitlRepository::get_by_request_id(&self.inner.pool, request_id)
            .await?
            .filter(|r| r.workflow_id == workflow_id)
            .ok_or_else(|| OrchestratorError::RequestNotFound(request_id.to_string()))?;

        if !request.is_pending() {
            return Ok(request.status == "rejected");
        }

        self.inner.get_active(workflow_id).ok_or_else(|| {
            OrchestratorError::WorkflowNotActive(workflow_id.to_string())
        })?;

        if !HitlRepository::reject(&self.inner.pool, request_id, user_id, reason).await? {
            let current = HitlRepository::get_by_request_id(&self.inner.pool, request_id).await?;
            return Ok(matches!(current, Some(r) if r.status == "rejected"));
        }

        EventRepository::insert_if_running(
            &self.inner.pool,
            workflow_id,
            "hitl_rejected",
            &json!({
                "node_id": request.node_id,
                "request_id": request_id,
                "user_id": user_id,
                "reason": reason
            }),
        )
        .await?;

        let error = format!("HITL rejected: {}", reason);
        WorkflowNodeRepository::mark_failed(
            &self.inner.pool,
            workflow_id,
            &request.node_id,
            &error,
        )
        .await?;
        Inner::fail_workflow(&self.inner, workflow_id, &error).await;

        info!("HITL request {} rejected by {}", request_id, user_id);
        Ok(true)
    }

    /// Cancel a running workflow. The row flips to failed with reason
    /// "cancelled" and no further events are emitted; the driver notices
    /// before its next batch and exits, discarding in-flight results.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<bool> {
        let cancelled =
            WorkflowRepository::mark_failed(&self.inner.pool, workflow_id, "cancelled").await?;
        if cancelled {
            info!("Workflow {} cancelled", workflow_id);
        }
        self.inner.remove_active(workflow_id);
        Ok(cancelled)
    }

    /// Crash-restart recovery: any workflow still marked running has no
    /// live driver in a fresh process and is failed with reason
    /// "orchestrator restart". Completed nodes, events, and HITL
    /// responses are preserved. Returns the recovered ids.
    pub async fn recover_on_startup(&self) -> Result<Vec<String>> {
        let running = WorkflowRepository::list_running_ids(&self.inner.pool).await?;
        for workflow_id in &running {
            Inner::fail_workflow(&self.inner, workflow_id, "orchestrator restart").await;
            warn!("Recovered stale workflow {} as failed", workflow_id);
        }
        Ok(running)
    }

    /// Shut down: wait for every driver up to `timeout`, abort the
    /// stragglers, and mark workflows that are still running as failed
    /// with reason "orchestrator restart".
    pub async fn shutdown(&self, timeout: Duration) {
        let handles: Vec<(String, JoinHandle<()>)> =
            self.inner.drivers.lock().drain().collect();

        for (workflow_id, handle) in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(timeout, handle).await.is_err() {
                warn!("Driver for {} did not stop in time; aborting", workflow_id);
                abort.abort();
            }
        }

        if let Ok(running) = WorkflowRepository::list_running_ids(&self.inner.pool).await {
            for workflow_id in running {
                Inner::fail_workflow(&self.inner, &workflow_id, "orchestrator restart").await;
            }
        }
        self.inner.active.lock().clear();
    }

    /// Number of workflows currently registered in the active map.
    pub fn active_count(&self) -> usize {
        self.inner.active.lock().len()
    }
}

/// Everything a node execution needs, cloned out of the graph so no lock
/// is held across awaits.
#[derive(Clone)]
struct NodeExec {
    node_id: String,
    kind: NodeKind,
    agent_id: Option<String>,
    config: Value,
    on_failure_skip: bool,
}

struct NodeOutcome {
    node_id: String,
    on_failure_skip: bool,
    result: std::result::Result<Value, String>,
}

/// What the driver does when the ready set is empty.
enum Stall {
    /// Every node is terminal; complete the workflow.
    AllDone,
    /// Park these (node id, prompt message) pairs and exit.
    ParkHitl(Vec<(String, String)>),
    /// A HITL node is already parked; just exit.
    StillParked,
    /// Remaining pending nodes are all blocked behind skip-policy
    /// failures; the workflow completes.
    BlockedBySkip,
    /// Nothing can run and nothing explains it.
    NoProgress,
}

fn stall_decision(graph: &Graph) -> Stall {
    let all_terminal = graph.nodes.values().all(|n| n.status.is_terminal());
    if all_terminal {
        return Stall::AllDone;
    }

    let completed: HashSet<String> = graph
        .nodes
        .values()
        .filter(|n| matches!(n.status, NodeStatus::Completed | NodeStatus::Skipped))
        .map(|n| n.node_id.clone())
        .collect();

    let parks: Vec<(String, String)> = graph
        .nodes
        .values()
        .filter(|n| {
            n.kind == NodeKind::HumanInLoop
                && n.status == NodeStatus::Pending
                && n.is_ready(&completed)
        })
        .map(|n| {
            let message = n
                .config
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Approval required")
                .to_string();
            (n.node_id.clone(), message)
        })
        .collect();
    if !parks.is_empty() {
        return Stall::ParkHitl(parks);
    }

    if graph
        .nodes
        .values()
        .any(|n| n.kind == NodeKind::HumanInLoop && n.status == NodeStatus::Running)
    {
        return Stall::StillParked;
    }

    // Fixpoint: a pending node is blocked when any dependency is a
    // failed node or is itself blocked.
    let mut blocked: HashSet<&str> = graph
        .nodes
        .values()
        .filter(|n| n.status == NodeStatus::Failed)
        .map(|n| n.node_id.as_str())
        .collect();
    let had_failures = !blocked.is_empty();
    loop {
        let mut changed = false;
        for node in graph.nodes.values() {
            if node.status == NodeStatus::Pending
                && !blocked.contains(node.node_id.as_str())
                && node.dependencies.iter().any(|d| blocked.contains(d.as_str()))
            {
                blocked.insert(node.node_id.as_str());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let all_pending_blocked = graph
        .nodes
        .values()
        .filter(|n| n.status == NodeStatus::Pending)
        .all(|n| blocked.contains(n.node_id.as_str()));

    if had_failures && all_pending_blocked {
        Stall::BlockedBySkip
    } else {
        Stall::NoProgress
    }
}

impl Inner {
    fn get_active(&self, workflow_id: &str) -> Option<ActiveWorkflowHandles> {
        self.active.lock().get(workflow_id).map(|active| ActiveWorkflowHandles {
            graph: Arc::clone(&active.graph),
            driver_gate: Arc::clone(&active.driver_gate),
        })
    }

    fn remove_active(&self, workflow_id: &str) {
        self.active.lock().remove(workflow_id);
    }

    fn spawn_driver(inner: &Arc<Inner>, workflow_id: &str) {
        let mut drivers = inner.drivers.lock();
        drivers.retain(|_, handle| !handle.is_finished());

        let task_inner = Arc::clone(inner);
        let task_id = workflow_id.to_string();
        let handle = tokio::spawn(async move {
            run_driver(task_inner, task_id).await;
        });
        drivers.insert(workflow_id.to_string(), handle);
    }

    async fn complete_workflow(inner: &Arc<Inner>, workflow_id: &str) {
        match WorkflowRepository::mark_completed(
            &inner.pool,
            workflow_id,
            &json!({ "success": true }).to_string(),
        )
        .await
        {
            Ok(true) => {
                if let Err(e) =
                    EventRepository::insert(&inner.pool, workflow_id, "workflow_completed", &json!({}))
                        .await
                {
                    error!("Failed to record workflow_completed for {}: {}", workflow_id, e);
                }
                info!("Workflow {} completed", workflow_id);
            }
            Ok(false) => debug!("Workflow {} already terminal", workflow_id),
            Err(e) => error!("Failed to complete workflow {}: {}", workflow_id, e),
        }
        inner.remove_active(workflow_id);
    }

    async fn fail_workflow(inner: &Arc<Inner>, workflow_id: &str, error_text: &str) {
        match WorkflowRepository::mark_failed(&inner.pool, workflow_id, error_text).await {
            Ok(true) => {
                if let Err(e) = EventRepository::insert(
                    &inner.pool,
                    workflow_id,
                    "workflow_failed",
                    &json!({ "error": error_text }),
                )
                .await
                {
                    error!("Failed to record workflow_failed for {}: {}", workflow_id, e);
                }
                warn!("Workflow {} failed: {}", workflow_id, error_text);
            }
            Ok(false) => debug!("Workflow {} already terminal", workflow_id),
            Err(e) => error!("Failed to fail workflow {}: {}", workflow_id, e),
        }
        inner.remove_active(workflow_id);
    }
}

struct ActiveWorkflowHandles {
    graph: Arc<Mutex<Graph>>,
    driver_gate: Arc<AsyncMutex<()>>,
}

async fn run_driver(inner: Arc<Inner>, workflow_id: String) {
    let Some(active) = inner.get_active(&workflow_id) else {
        return;
    };
    // Single driver per workflow: lose the race, leave quietly.
    let Ok(_gate) = active.driver_gate.clone().try_lock_owned() else {
        debug!("Driver already running for {}", workflow_id);
        return;
    };

    loop {
        // The workflow row is the cross-driver authority; cancellation
        // and external failure are observed here.
        let row = match WorkflowRepository::get_by_id(&inner.pool, &workflow_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                inner.remove_active(&workflow_id);
                return;
            }
            Err(e) => {
                Inner::fail_workflow(&inner, &workflow_id, &format!("store error: {}", e)).await;
                return;
            }
        };
        if !row.is_running() {
            inner.remove_active(&workflow_id);
            return;
        }

        let (batch, results) = {
            let graph = active.graph.lock();
            let completed: HashSet<String> = graph
                .nodes
                .values()
                .filter(|n| matches!(n.status, NodeStatus::Completed | NodeStatus::Skipped))
                .map(|n| n.node_id.clone())
                .collect();

            let batch: Vec<NodeExec> = graph
                .get_ready_nodes(&completed)
                .into_iter()
                .filter(|n| n.kind != NodeKind::HumanInLoop)
                .map(|n| NodeExec {
                    node_id: n.node_id.clone(),
                    kind: n.kind,
                    agent_id: n.agent_id.clone(),
                    config: n.config.clone(),
                    on_failure_skip: n
                        .config
                        .get("on_failure")
                        .and_then(Value::as_str)
                        .map(|policy| policy == "skip")
                        .unwrap_or(false),
                })
                .collect();

            let results: HashMap<String, Value> = graph
                .nodes
                .values()
                .filter(|n| n.status == NodeStatus::Completed)
                .filter_map(|n| n.result.clone().map(|r| (n.node_id.clone(), r)))
                .collect();

            (batch, results)
        };

        if batch.is_empty() {
            let decision = stall_decision(&active.graph.lock());
            match decision {
                Stall::AllDone | Stall::BlockedBySkip => {
                    Inner::complete_workflow(&inner, &workflow_id).await;
                }
                Stall::ParkHitl(parks) => {
                    for (node_id, message) in parks {
                        park_hitl(&inner, &active, &workflow_id, &node_id, &message).await;
                    }
                    // The workflow stays active; approval relaunches us.
                }
                Stall::StillParked => {
                    debug!("Workflow {} still awaiting HITL", workflow_id);
                }
                Stall::NoProgress => {
                    Inner::fail_workflow(&inner, &workflow_id, "no progress possible").await;
                }
            }
            return;
        }

        // Mark the batch running in memory before dispatch so readiness
        // never hands the same node to two iterations.
        {
            let mut graph = active.graph.lock();
            for exec in &batch {
                if let Some(node) = graph.get_node_mut(&exec.node_id) {
                    node.status = NodeStatus::Running;
                }
            }
        }

        let outcomes = join_all(batch.into_iter().map(|exec| {
            let inner = Arc::clone(&inner);
            let workflow_id = workflow_id.clone();
            let results = results.clone();
            async move { execute_node(inner, workflow_id, exec, results).await }
        }))
        .await;

        // Cancellation during the batch: discard the stored results.
        let still_running = matches!(
            WorkflowRepository::get_by_id(&inner.pool, &workflow_id).await,
            Ok(Some(row)) if row.is_running()
        );
        if !still_running {
            for outcome in &outcomes {
                if let Err(e) =
                    WorkflowNodeRepository::mark_cancelled(&inner.pool, &workflow_id, &outcome.node_id)
                        .await
                {
                    error!("Failed to cancel node {}: {}", outcome.node_id, e);
                }
            }
            inner.remove_active(&workflow_id);
            return;
        }

        {
            let mut graph = active.graph.lock();
            for outcome in &outcomes {
                if let Some(node) = graph.get_node_mut(&outcome.node_id) {
                    match &outcome.result {
                        Ok(value) => {
                            node.status = NodeStatus::Completed;
                            node.result = Some(value.clone());
                        }
                        Err(message) => {
                            node.status = NodeStatus::Failed;
                            node.error = Some(message.clone());
                        }
                    }
                }
            }
        }

        // A failure without a skip policy is fatal for the workflow.
        if let Some(fatal) = outcomes
            .iter()
            .find(|o| o.result.is_err() && !o.on_failure_skip)
        {
            let message = match &fatal.result {
                Err(e) => format!("Node {} failed: {}", fatal.node_id, e),
                Ok(_) => unreachable!("fatal outcomes are errors"),
            };
            Inner::fail_workflow(&inner, &workflow_id, &message).await;
            return;
        }
    }
}

async fn park_hitl(
    inner: &Arc<Inner>,
    active: &ActiveWorkflowHandles,
    workflow_id: &str,
    node_id: &str,
    message: &str,
) {
    let request_id = Uuid::new_v4().to_string();

    {
        let mut graph = active.graph.lock();
        if let Some(node) = graph.get_node_mut(node_id) {
            node.status = NodeStatus::Running;
        }
    }

    if let Err(e) =
        WorkflowNodeRepository::mark_waiting_hitl(&inner.pool, workflow_id, node_id).await
    {
        error!("Failed to park node {}: {}", node_id, e);
        return;
    }
    if let Err(e) =
        HitlRepository::create(&inner.pool, &request_id, workflow_id, node_id, message).await
    {
        error!("Failed to create HITL request for {}: {}", node_id, e);
        return;
    }
    if let Err(e) = EventRepository::insert_if_running(
        &inner.pool,
        workflow_id,
        "hitl_requested",
        &json!({ "node_id": node_id, "request_id": request_id }),
    )
    .await
    {
        error!("Failed to record hitl_requested for {}: {}", node_id, e);
    }

    info!(
        "Workflow {} parked at HITL node {} (request {})",
        workflow_id, node_id, request_id
    );
}

async fn execute_node(
    inner: Arc<Inner>,
    workflow_id: String,
    exec: NodeExec,
    results: HashMap<String, Value>,
) -> NodeOutcome {
    debug!("Executing node {} ({})", exec.node_id, exec.kind);

    if let Err(e) =
        WorkflowNodeRepository::mark_running(&inner.pool, &workflow_id, &exec.node_id).await
    {
        error!("Failed to mark node {} running: {}", exec.node_id, e);
    }
    if let Err(e) = EventRepository::insert_if_running(
        &inner.pool,
        &workflow_id,
        "node_started",
        &json!({ "node_id": exec.node_id, "node_type": exec.kind.as_str() }),
    )
    .await
    {
        error!("Failed to record node_started for {}: {}", exec.node_id, e);
    }

    let result = dispatch_node(&inner, &workflow_id, &exec, &results).await;

    match &result {
        Ok(value) => {
            if let Err(e) = WorkflowNodeRepository::mark_completed(
                &inner.pool,
                &workflow_id,
                &exec.node_id,
                &value.to_string(),
            )
            .await
            {
                error!("Failed to mark node {} completed: {}", exec.node_id, e);
            }
            if let Err(e) = EventRepository::insert_if_running(
                &inner.pool,
                &workflow_id,
                "node_completed",
                &json!({ "node_id": exec.node_id, "result": value }),
            )
            .await
            {
                error!("Failed to record node_completed for {}: {}", exec.node_id, e);
            }
        }
        Err(message) => {
            if let Err(e) = WorkflowNodeRepository::mark_failed(
                &inner.pool,
                &workflow_id,
                &exec.node_id,
                message,
            )
            .await
            {
                error!("Failed to mark node {} failed: {}", exec.node_id, e);
            }
            if let Err(e) = EventRepository::insert_if_running(
                &inner.pool,
                &workflow_id,
                "node_failed",
                &json!({ "node_id": exec.node_id, "error": message }),
            )
            .await
            {
                error!("Failed to record node_failed for {}: {}", exec.node_id, e);
            }
        }
    }

    NodeOutcome {
        node_id: exec.node_id,
        on_failure_skip: exec.on_failure_skip,
        result,
    }
}

async fn dispatch_node(
    inner: &Arc<Inner>,
    workflow_id: &str,
    exec: &NodeExec,
    results: &HashMap<String, Value>,
) -> std::result::Result<Value, String> {
    let raw_input = exec
        .config
        .get("input")
        .cloned()
        .unwrap_or_else(|| json!({}));
    let input = substitute_placeholders(&raw_input, results).map_err(|e| e.to_string())?;

    match exec.kind {
        NodeKind::Tool => execute_tool_node(inner, workflow_id, exec, input).await,
        NodeKind::Agent => execute_agent_node(inner, workflow_id, exec, input).await,
        NodeKind::Decision => {
            // Reserved kind: no evaluator. The node completes after
            // (trivially) deciding not to skip anything.
            Ok(json!({ "decision": "pass", "skipped": [] }))
        }
        NodeKind::HumanInLoop => {
            Err("human_in_loop nodes are parked, not executed".to_string())
        }
    }
}

async fn execute_tool_node(
    inner: &Arc<Inner>,
    workflow_id: &str,
    exec: &NodeExec,
    input: Value,
) -> std::result::Result<Value, String> {
    let Some(tool_name) = exec.config.get("tool_name").and_then(Value::as_str) else {
        return Err("No tool_name specified".to_string());
    };

    // Inject execution context so tools can emit artifacts.
    let mut args = input;
    if let Value::Object(map) = &mut args {
        map.entry("workflow_id".to_string())
            .or_insert_with(|| json!(workflow_id));
        map.entry("node_id".to_string())
            .or_insert_with(|| json!(exec.node_id));
        map.entry("debug_dir".to_string()).or_insert_with(|| {
            json!(format!("/tmp/weft_artifacts/{}/{}", workflow_id, exec.node_id))
        });
    }

    let envelope = inner.tools.execute(tool_name, args).await;
    if envelope.success {
        Ok(envelope.result.unwrap_or(Value::Null))
    } else {
        Err(envelope
            .error
            .unwrap_or_else(|| format!("Tool {} failed", tool_name)))
    }
}

async fn execute_agent_node(
    inner: &Arc<Inner>,
    workflow_id: &str,
    exec: &NodeExec,
    input: Value,
) -> std::result::Result<Value, String> {
    let agent_id = exec
        .agent_id
        .clone()
        .or_else(|| {
            exec.config
                .get("agent_id")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .ok_or_else(|| "No agent_id specified".to_string())?;

    let execution_id = Uuid::new_v4().to_string();
    if let Err(e) = crate::db::repositories::AgentExecutionRepository::start(
        &inner.pool,
        &execution_id,
        &agent_id,
        Some(workflow_id),
        Some(&exec.node_id),
        &input.to_string(),
    )
    .await
    {
        error!("Failed to record agent execution start: {}", e);
    }

    let result = inner.agents.execute_agent(&agent_id, &input).await;
    if result.success {
        let output = json!({
            "response": result.response,
            "llm_used": result.llm_used,
        });
        if let Err(e) = crate::db::repositories::AgentExecutionRepository::complete(
            &inner.pool,
            &execution_id,
            &output.to_string(),
        )
        .await
        {
            error!("Failed to record agent execution completion: {}", e);
        }
        Ok(output)
    } else {
        let message = result
            .error
            .unwrap_or_else(|| format!("Agent {} failed", agent_id));
        if let Err(e) = crate::db::repositories::AgentExecutionRepository::fail(
            &inner.pool,
            &execution_id,
            &message,
        )
        .await
        {
            error!("Failed to record agent execution failure: {}", e);
        }
        Err(message)
    }
}
