//! Structural validation of a flow's node list.
//!
//! Validation never short-circuits: every structural problem is collected
//! in one pass so the editor can surface them all at once. Errors make the
//! flow unrunnable; warnings do not.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{Node, NodeKind};

/// The outcome of validating a node list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a node list for structural correctness.
///
/// Rules:
/// - an empty list is valid, with a warning;
/// - every node needs a non-empty id (validation continues past violations);
/// - node ids must be unique;
/// - kind-specific config: `input` needs a non-empty `fields` list, `agent`
///   needs a `capability`, `output` needs an `output_type`;
/// - `next` references and condition branch targets must name existing
///   nodes;
/// - missing input/output nodes are warnings, not errors.
///
/// The error set is the same regardless of the order of independent
/// invalid nodes.
pub fn validate_nodes(nodes: &[Node]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if nodes.is_empty() {
        warnings.push("no nodes defined".to_string());
        return ValidationReport {
            valid: true,
            errors,
            warnings,
        };
    }

    // Unique, non-empty ids.
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in nodes {
        if node.id.is_empty() {
            errors.push(format!("node '{}' has an empty id", node.name));
        } else if !seen_ids.insert(node.id.as_str()) {
            errors.push(format!("duplicate node id: {}", node.id));
        }
    }

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    for node in nodes {
        check_config(node, &mut errors);
        check_references(node, &node_ids, &mut errors);
    }

    if !nodes.iter().any(|n| n.kind == NodeKind::Input) {
        warnings.push("flow has no input node".to_string());
    }
    if !nodes.iter().any(|n| n.kind == NodeKind::Output) {
        warnings.push("flow has no output node".to_string());
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Kind-specific config requirements.
fn check_config(node: &Node, errors: &mut Vec<String>) {
    match node.kind {
        NodeKind::Input => {
            let has_fields = node
                .config
                .get("fields")
                .and_then(|f| f.as_array())
                .is_some_and(|f| !f.is_empty());
            if !has_fields {
                errors.push(format!(
                    "input node '{}' must declare at least one field",
                    node.id
                ));
            }
        }
        NodeKind::Agent => {
            let has_capability = node
                .config
                .get("capability")
                .and_then(|c| c.as_str())
                .is_some_and(|c| !c.is_empty());
            if !has_capability {
                errors.push(format!(
                    "agent node '{}' must reference a capability",
                    node.id
                ));
            }
        }
        NodeKind::Output => {
            let has_type = node
                .config
                .get("output_type")
                .and_then(|t| t.as_str())
                .is_some_and(|t| !t.is_empty());
            if !has_type {
                errors.push(format!(
                    "output node '{}' must declare an output type",
                    node.id
                ));
            }
        }
        NodeKind::Condition | NodeKind::Transform => {}
    }
}

/// Every `next` reference and condition branch target must resolve.
fn check_references(node: &Node, node_ids: &HashSet<&str>, errors: &mut Vec<String>) {
    if let Some(next) = &node.next {
        if !node_ids.contains(next.as_str()) {
            errors.push(format!(
                "node '{}' references unknown next node: {next}",
                node.id
            ));
        }
    }
    if node.kind == NodeKind::Condition {
        for key in ["on_true", "on_false"] {
            if let Some(target) = node.config.get(key).and_then(|t| t.as_str()) {
                if !node_ids.contains(target) {
                    errors.push(format!(
                        "condition node '{}' references unknown {key} target: {target}",
                        node.id
                    ));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;
    use serde_json::json;

    fn input_node(id: &str) -> Node {
        Node::new(id, NodeKind::Input, "Input").with_config(json!({"fields": [{"name": "url"}]}))
    }

    fn agent_node(id: &str) -> Node {
        Node::new(id, NodeKind::Agent, "Agent").with_config(json!({"capability": "summarizer"}))
    }

    fn output_node(id: &str) -> Node {
        Node::new(id, NodeKind::Output, "Output").with_config(json!({"output_type": "json"}))
    }

    #[test]
    fn empty_list_is_valid_with_warning() {
        let report = validate_nodes(&[]);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings, vec!["no nodes defined"]);
    }

    #[test]
    fn valid_linear_flow() {
        let nodes = vec![
            input_node("i1").with_next("a1"),
            agent_node("a1").with_next("o1"),
            output_node("o1"),
        ];
        let report = validate_nodes(&nodes);
        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn duplicate_ids_reported_by_name() {
        let nodes = vec![input_node("a"), agent_node("a"), output_node("o1")];
        let report = validate_nodes(&nodes);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e == "duplicate node id: a"));
    }

    #[test]
    fn empty_id_does_not_stop_validation() {
        let nodes = vec![
            Node::new("", NodeKind::Input, "Broken"),
            agent_node(""), // second empty id: reported as empty, not duplicate
            output_node("o1"),
        ];
        let report = validate_nodes(&nodes);
        assert!(!report.valid);
        // Both problems of the first node are present: empty id AND missing fields.
        assert!(report.errors.iter().any(|e| e.contains("empty id")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("must declare at least one field")));
    }

    #[test]
    fn kind_specific_config_rules() {
        let nodes = vec![
            Node::new("i1", NodeKind::Input, "Input").with_config(json!({"fields": []})),
            Node::new("a1", NodeKind::Agent, "Agent").with_config(json!({"capability": ""})),
            Node::new("o1", NodeKind::Output, "Output"),
        ];
        let report = validate_nodes(&nodes);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.iter().any(|e| e.contains("i1")));
        assert!(report.errors.iter().any(|e| e.contains("a1")));
        assert!(report.errors.iter().any(|e| e.contains("o1")));
    }

    #[test]
    fn dangling_next_reference() {
        let nodes = vec![input_node("i1").with_next("ghost"), output_node("o1")];
        let report = validate_nodes(&nodes);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("unknown next node: ghost")));
    }

    #[test]
    fn dangling_condition_branch() {
        let nodes = vec![
            input_node("i1").with_next("c1"),
            Node::new("c1", NodeKind::Condition, "Branch").with_config(json!({
                "predicate": "x > 1",
                "on_true": "o1",
                "on_false": "ghost"
            })),
            output_node("o1"),
        ];
        let report = validate_nodes(&nodes);
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("unknown on_false target: ghost")));
    }

    #[test]
    fn missing_input_and_output_are_warnings() {
        let nodes = vec![agent_node("a1")];
        let report = validate_nodes(&nodes);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("no input node")));
        assert!(report.warnings.iter().any(|w| w.contains("no output node")));
    }

    #[test]
    fn error_set_is_order_independent() {
        let forward = vec![
            Node::new("i1", NodeKind::Input, "Input"),
            Node::new("a1", NodeKind::Agent, "Agent"),
            output_node("o1"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let mut errs_fwd = validate_nodes(&forward).errors;
        let mut errs_rev = validate_nodes(&reversed).errors;
        errs_fwd.sort();
        errs_rev.sort();
        assert_eq!(errs_fwd, errs_rev);
    }
}
