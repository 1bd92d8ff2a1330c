//! Core execution loop — walks one flow's node graph for one run.
//!
//! The walk keeps a private cursor; the record's `current_node_id` is only
//! ever written (published for observers), never read back. Cancellation is
//! cooperative: the authoritative status is checked before each dispatch
//! and again before committing a result, so an in-flight handler result is
//! discarded once a cancel has been observed. A failing node fails the
//! whole execution immediately — there is no continuation past it.
//!
//! The only potentially slow handler call is the agent invocation, which
//! bounds itself with a timeout (node config or engine default).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::EngineConfig;
use crate::node_ctx::NodeCtx;
use crate::recorder::ExecutionRecorder;
use crate::traits::{AgentProvider, NodeHandler};
use crate::types::{
    ExecutionStatus, Flow, LogLevel, Node, NodeExecutionUpdate, NodeKind, NodeOutput,
};

/// Everything one execution walk needs, assembled by the engine at `start`.
pub(crate) struct RunContext {
    pub execution_id: String,
    pub flow: Flow,
    pub input: Value,
    pub recorder: Arc<ExecutionRecorder>,
    pub handlers: Arc<BTreeMap<NodeKind, Arc<dyn NodeHandler>>>,
    pub agents: Arc<dyn AgentProvider>,
    pub config: EngineConfig,
}

/// Walk the graph from the input node until a terminal node, a failure, or
/// an observed cancellation. All record mutation goes through the recorder.
pub(crate) async fn run_execution(ctx: RunContext) {
    let node_ctx = NodeCtx::new(
        ctx.execution_id.clone(),
        ctx.flow.id.clone(),
        Arc::clone(&ctx.agents),
        ctx.config.agent_timeout_ms,
    );

    // Private walk cursor: first input node, else the first node. A flow
    // with zero nodes completes immediately with empty output.
    let mut cursor: Option<String> = ctx
        .flow
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::Input)
        .or_else(|| ctx.flow.nodes.first())
        .map(|n| n.id.clone());

    let mut payload = ctx.input.clone();
    let mut tokens_total: u64 = 0;
    let mut cost_total: f64 = 0.0;

    while let Some(node_id) = cursor.take() {
        if !still_running(&ctx).await {
            return;
        }

        let Some(node) = ctx.flow.node(&node_id) else {
            engine_fault(
                &ctx,
                format!(
                    "next node '{node_id}' does not exist in flow '{}'",
                    ctx.flow.id
                ),
            )
            .await;
            return;
        };
        let Some(handler) = ctx.handlers.get(&node.kind) else {
            engine_fault(
                &ctx,
                format!("no handler registered for node kind '{}'", node.kind),
            )
            .await;
            return;
        };

        if commit(
            &ctx,
            &node.id,
            NodeExecutionUpdate::started(payload.clone()),
        )
        .await
        .is_err()
        {
            return;
        }

        let result = handler.run(node, payload.clone(), &node_ctx).await;

        // A cancel may have landed while the handler was in flight; its
        // result is discarded, never committed.
        if !still_running(&ctx).await {
            return;
        }

        match result {
            Ok(output) => {
                if commit(
                    &ctx,
                    &node.id,
                    NodeExecutionUpdate::completed(output.value.clone()),
                )
                .await
                .is_err()
                {
                    return;
                }
                tokens_total += output.tokens_used;
                cost_total += output.cost;
                let _ = ctx
                    .recorder
                    .add_usage(&ctx.execution_id, output.tokens_used, output.cost)
                    .await;

                match advance(node, &output) {
                    Some(next) => {
                        payload = output.value;
                        cursor = Some(next);
                    }
                    None => {
                        let _ = ctx
                            .recorder
                            .complete(
                                &ctx.execution_id,
                                Some(output.value),
                                tokens_total,
                                cost_total,
                            )
                            .await;
                        return;
                    }
                }
            }
            Err(error) => {
                let message = error.to_string();
                let details = serde_json::to_value(&error).ok();
                let _ = ctx
                    .recorder
                    .update_node(
                        &ctx.execution_id,
                        &node.id,
                        NodeExecutionUpdate::failed(message.clone()),
                    )
                    .await;
                let _ = ctx
                    .recorder
                    .add_log(
                        &ctx.execution_id,
                        LogLevel::Error,
                        format!("node '{}' failed: {message}", node.id),
                        Some(node.id.clone()),
                    )
                    .await;
                let _ = ctx.recorder.fail(&ctx.execution_id, message, details).await;
                return;
            }
        }
    }

    // Zero nodes: the walk never started.
    let _ = ctx
        .recorder
        .complete(&ctx.execution_id, None, tokens_total, cost_total)
        .await;
}

/// Where the walk goes after a successful node: nowhere past an output
/// node; a condition's chosen branch; otherwise the static `next`.
fn advance(node: &Node, output: &NodeOutput) -> Option<String> {
    if node.kind == NodeKind::Output {
        return None;
    }
    output.branch.clone().or_else(|| node.next.clone())
}

async fn still_running(ctx: &RunContext) -> bool {
    matches!(
        ctx.recorder.status(&ctx.execution_id).await,
        Some(ExecutionStatus::Running)
    )
}

/// Commit a node-state transition; a rejection means the execution was
/// finished out from under the walk (cancel raced the commit) and the walk
/// must stop.
async fn commit(
    ctx: &RunContext,
    node_id: &str,
    update: NodeExecutionUpdate,
) -> Result<(), crate::engine::EngineError> {
    ctx.recorder
        .update_node(&ctx.execution_id, node_id, update)
        .await
        .map(|_| ())
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// An internal-invariant violation discovered mid-walk (dangling next
/// reference, missing handler). Logged and recorded as a failure — never a
/// panic out of the orchestrator.
async fn engine_fault(ctx: &RunContext, message: String) {
    tracing::error!(
        execution_id = %ctx.execution_id,
        flow_id = %ctx.flow.id,
        %message,
        "engine fault during graph walk"
    );
    let _ = ctx
        .recorder
        .add_log(
            &ctx.execution_id,
            LogLevel::Error,
            format!("engine fault: {message}"),
            None,
        )
        .await;
    let _ = ctx
        .recorder
        .fail(
            &ctx.execution_id,
            message,
            Some(serde_json::json!({"kind": "engine_fault"})),
        )
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{InMemoryExecutionStore, StaticAgentProvider};
    use crate::emitter::ProgressEmitter;
    use crate::nodes::default_handlers;
    use crate::types::{FlowExecution, TriggerKind};
    use serde_json::json;

    /// Drive `run_execution` directly over a flow, bypassing the engine's
    /// up-front validation — how walk-time faults are provoked.
    async fn run_raw(flow: Flow, input: Value) -> FlowExecution {
        run_raw_with_handlers(flow, input, Arc::new(default_handlers())).await
    }

    async fn run_raw_with_handlers(
        flow: Flow,
        input: Value,
        handlers: Arc<BTreeMap<NodeKind, Arc<dyn NodeHandler>>>,
    ) -> FlowExecution {
        let store = Arc::new(InMemoryExecutionStore::new());
        let emitter = Arc::new(ProgressEmitter::new(64));
        let recorder = Arc::new(ExecutionRecorder::new(store, emitter));

        let execution = FlowExecution::new(&flow.id, input.clone(), TriggerKind::Manual, None);
        let execution_id = execution.id.clone();
        recorder.create(execution).await.unwrap();

        let ctx = RunContext {
            execution_id: execution_id.clone(),
            flow,
            input,
            recorder: Arc::clone(&recorder),
            handlers,
            agents: Arc::new(StaticAgentProvider::new()),
            config: crate::engine::EngineConfig::default(),
        };
        run_execution(ctx).await;
        recorder.snapshot(&execution_id).await.unwrap()
    }

    #[tokio::test]
    async fn dangling_next_reference_faults_the_run() {
        let mut flow = Flow::new("f1", "Broken");
        flow.nodes = vec![Node::new("t1", NodeKind::Transform, "Reshape")
            .with_config(json!({"expression": "."}))
            .with_next("ghost")];

        let execution = run_raw(flow, json!({"x": 1})).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.error_details.as_ref().unwrap()["kind"], "engine_fault");
        assert!(execution
            .logs
            .iter()
            .any(|l| l.message.contains("engine fault")));
        // The node itself succeeded before the fault was discovered.
        assert!(execution.node_execution("t1").is_some());
    }

    #[tokio::test]
    async fn missing_handler_faults_the_run() {
        let mut handlers = default_handlers();
        handlers.remove(&NodeKind::Transform);

        let mut flow = Flow::new("f1", "No Handler");
        flow.nodes = vec![Node::new("t1", NodeKind::Transform, "Reshape")
            .with_config(json!({"expression": "."}))];

        let execution = run_raw_with_handlers(flow, json!({}), Arc::new(handlers)).await;
        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution
            .error
            .as_deref()
            .unwrap()
            .contains("no handler registered"));
        assert_eq!(execution.error_details.unwrap()["kind"], "engine_fault");
    }

    #[tokio::test]
    async fn walk_starts_at_the_input_node_not_list_order() {
        let mut flow = Flow::new("f1", "Out Of Order");
        flow.nodes = vec![
            Node::new("o1", NodeKind::Output, "Output")
                .with_config(json!({"output_type": "json"})),
            Node::new("i1", NodeKind::Input, "Input")
                .with_config(json!({"fields": [{"name": "x"}]}))
                .with_next("o1"),
        ];

        let execution = run_raw(flow, json!({"x": 5})).await;
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.node_executions[0].node_id, "i1");
        assert_eq!(execution.output, Some(json!({"x": 5})));
    }

    #[test]
    fn advance_follows_static_next() {
        let node = Node::new("a1", NodeKind::Agent, "Agent").with_next("o1");
        let output = NodeOutput::value(json!({}));
        assert_eq!(advance(&node, &output).as_deref(), Some("o1"));
    }

    #[test]
    fn advance_prefers_branch_over_next() {
        let node = Node::new("c1", NodeKind::Condition, "Branch").with_next("fallthrough");
        let output = NodeOutput {
            value: json!({}),
            tokens_used: 0,
            cost: 0.0,
            branch: Some("chosen".into()),
        };
        assert_eq!(advance(&node, &output).as_deref(), Some("chosen"));
    }

    #[test]
    fn advance_stops_at_output_nodes_even_with_next() {
        let node = Node::new("o1", NodeKind::Output, "Output").with_next("beyond");
        let output = NodeOutput::value(json!({}));
        assert!(advance(&node, &output).is_none());
    }

    #[test]
    fn advance_stops_when_nothing_follows() {
        let node = Node::new("t1", NodeKind::Transform, "Reshape");
        let output = NodeOutput::value(json!({}));
        assert!(advance(&node, &output).is_none());
    }
}
