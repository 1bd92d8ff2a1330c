//! Flow definition types — the contract between the editor and the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::default_true;

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// A reusable workflow definition: a node graph plus its IO schemas.
///
/// The `slug` is a unique identifier derived from the name (see
/// [`Flow::slugify`]). `is_active` gates whether the lifecycle controller
/// will start executions for this flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub status: FlowStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
    /// Arbitrary metadata. BTreeMap for deterministic serialization.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Flow {
    /// Create an empty draft flow with a slug derived from the name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = Self::slugify(&name);
        Self {
            id: id.into(),
            name,
            slug,
            description: None,
            nodes: Vec::new(),
            status: FlowStatus::Draft,
            is_active: true,
            version: "0.1.0".into(),
            category: None,
            input_schema: Value::Null,
            output_schema: Value::Null,
            metadata: BTreeMap::new(),
        }
    }

    /// Derive a slug: lowercase, runs of non-alphanumerics collapsed to a
    /// single `-`, no leading/trailing dashes.
    pub fn slugify(name: &str) -> String {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }

    /// Look up a node by id.
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

/// Editorial status of a flow definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FlowStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A typed step within a flow's graph.
///
/// `config` is the kind-specific configuration, parsed by the matching node
/// handler (see the typed config structs below). `next` names the node the
/// walk continues at; condition nodes route via their branch targets instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: None,
            config: Value::Null,
            next: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }
}

/// The five node kinds the engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeKind {
    Input,
    Agent,
    Output,
    Condition,
    Transform,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Agent => "agent",
            Self::Output => "output",
            Self::Condition => "condition",
            Self::Transform => "transform",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed node configs
// ---------------------------------------------------------------------------

/// Config for `input` nodes: the ordered field specs projected out of the
/// execution input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct InputConfig {
    pub fields: Vec<FieldSpec>,
}

/// A single declared input field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct FieldSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Config for `agent` nodes: which external capability to invoke and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Opaque identifier naming an external agent/LLM configuration.
    pub capability: String,
    /// Provider-specific invocation options, passed through untouched.
    #[serde(default)]
    pub options: Value,
    /// Per-node bound on the capability call. Falls back to the engine
    /// default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Config for `output` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// `"json"` passes the value through; `"text"` renders it to a string.
    pub output_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Config for `condition` nodes: a predicate plus branch targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct ConditionConfig {
    /// Expression evaluated against the node's input, e.g.
    /// `"score >= 0.8 && status == 'ok'"`.
    pub predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_true: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_false: Option<String>,
}

/// Config for `transform` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct TransformConfig {
    /// `.` for identity, or a dot path (`result.items`) selecting a value
    /// out of the input.
    pub expression: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
