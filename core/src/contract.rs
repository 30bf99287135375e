use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Canonical tool call: tool name and JSON arguments.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Json,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: Json) -> Self {
        Self { tool: tool.into(), args }
    }
}

/// What an environment reports after every call. `reward` is the reward of
/// the last step; per-environment fields live in `data`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub terminated: bool,
    pub truncated: bool,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub data: Json,
}

/// Versioned, engine-tagged serialized state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub version: u32,
    pub engine: String,
    pub data: Json,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Bad input from the caller: unknown tool, malformed arguments, bad config.
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The engine broke one of its own invariants.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Validation(err.to_string())
    }
}

#[async_trait]
pub trait Environment: Send + Sync {
    async fn initialize(&mut self) -> Result<Observation, EngineError>;
    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError>;
    async fn checkpoint(&self) -> Result<Checkpoint, EngineError>;
    /// Replace the whole environment state with a checkpoint taken earlier.
    async fn restore(&mut self, checkpoint: &Checkpoint) -> Result<Observation, EngineError>;
    async fn terminate(&mut self) -> Result<Observation, EngineError>;
}

/// Engines whose full state can be written out as JSON.
#[async_trait]
pub trait ReproducibleEngine: Send + Sync {
    async fn serialize_engine(&self) -> Result<Json, EngineError>;
    fn engine_name(&self) -> String;
}

pub async fn make_checkpoint(engine: &dyn ReproducibleEngine, version: u32) -> Result<Checkpoint, EngineError> {
    let data = engine.serialize_engine().await?;
    Ok(Checkpoint { version, engine: engine.engine_name(), data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter(u32);

    #[async_trait]
    impl ReproducibleEngine for Counter {
        async fn serialize_engine(&self) -> Result<Json, EngineError> {
            Ok(json!({ "count": self.0 }))
        }
        fn engine_name(&self) -> String { "counter".into() }
    }

    #[tokio::test]
    async fn checkpoint_carries_engine_name_and_data() {
        let cp = make_checkpoint(&Counter(3), 2).await.unwrap();
        assert_eq!(cp, Checkpoint { version: 2, engine: "counter".into(), data: json!({ "count": 3 }) });
    }

    #[test]
    fn tool_call_args_default_to_null() {
        let call: ToolCall = serde_json::from_str(r#"{"tool":"interact"}"#).unwrap();
        assert_eq!(call, ToolCall::new("interact", Json::Null));
    }

    #[test]
    fn json_errors_are_validation_errors() {
        let err: EngineError = serde_json::from_str::<ToolCall>("{").unwrap_err().into();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
