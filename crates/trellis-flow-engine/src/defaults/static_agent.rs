//! Canned agent provider for tests and offline embedding.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::traits::{AgentProvider, AgentReply};
use crate::types::NodeError;

/// An [`AgentProvider`] that serves preconfigured replies per capability.
///
/// Unknown capabilities fail with [`NodeError::Fatal`]. An optional
/// per-capability latency simulates a slow model call for timeout tests.
#[derive(Default)]
pub struct StaticAgentProvider {
    scripts: RwLock<BTreeMap<String, Script>>,
}

struct Script {
    outcome: Result<AgentReply, String>,
    latency: Option<Duration>,
}

impl StaticAgentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reply` whenever `capability` is invoked.
    pub fn with_reply(self, capability: impl Into<String>, reply: AgentReply) -> Self {
        self.scripts.write().insert(
            capability.into(),
            Script {
                outcome: Ok(reply),
                latency: None,
            },
        );
        self
    }

    /// Fail every invocation of `capability` with the given message.
    pub fn with_failure(self, capability: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.write().insert(
            capability.into(),
            Script {
                outcome: Err(message.into()),
                latency: None,
            },
        );
        self
    }

    /// Delay invocations of `capability` by `latency_ms` before responding.
    /// The capability must already have a scripted reply or failure.
    pub fn with_latency(self, capability: &str, latency_ms: u64) -> Self {
        if let Some(script) = self.scripts.write().get_mut(capability) {
            script.latency = Some(Duration::from_millis(latency_ms));
        }
        self
    }
}

#[async_trait]
impl AgentProvider for StaticAgentProvider {
    async fn invoke(
        &self,
        capability: &str,
        _input: Value,
        _options: &Value,
    ) -> Result<AgentReply, NodeError> {
        let (outcome, latency) = {
            let scripts = self.scripts.read();
            let script = scripts.get(capability).ok_or_else(|| NodeError::Fatal {
                message: format!("unknown capability: {capability}"),
            })?;
            (
                script.outcome.as_ref().map(Clone::clone).map_err(Clone::clone),
                script.latency,
            )
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        outcome.map_err(|message| NodeError::Fatal { message })
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_reply() {
        let provider = StaticAgentProvider::new().with_reply(
            "echo",
            AgentReply {
                output: json!("hi"),
                tokens_used: 10,
                cost: 0.001,
            },
        );
        let reply = provider.invoke("echo", json!({}), &json!({})).await.unwrap();
        assert_eq!(reply.output, json!("hi"));
        assert_eq!(reply.tokens_used, 10);
    }

    #[tokio::test]
    async fn scripted_failure() {
        let provider = StaticAgentProvider::new().with_failure("broken", "rate limited");
        let err = provider
            .invoke("broken", json!({}), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "fatal: rate limited");
    }

    #[tokio::test]
    async fn unknown_capability() {
        let provider = StaticAgentProvider::new();
        let err = provider
            .invoke("ghost", json!({}), &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown capability"));
    }
}
