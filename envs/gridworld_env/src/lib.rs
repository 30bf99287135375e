//! Grid-world engine exposed through the shared `Environment` contract.

mod presets;

use std::sync::Arc;

use async_trait::async_trait;
use gridworld_core::{
    make_checkpoint, register_environment_with_config, Checkpoint, EngineError, Environment, Observation,
    ReproducibleEngine, ToolCall,
};
use gridworld_rs::{Action, EnvConfig, GridEnvironment, Level, RewardMap, StepOutcome, ThingId, WorldError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tracing::debug;

pub use presets::{preset_level, preset_names};

pub const ENGINE_NAME: &str = "gridworld";
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of an embedded layout; ignored when `layout` is given.
    pub preset: String,
    /// Explicit ASCII rows, first row north.
    pub layout: Option<Vec<String>>,
    pub max_steps: Option<u32>,
    /// Reward table; `None` means [`default_rewards`].
    pub rewards: Option<RewardMap>,
}

impl Default for Config {
    fn default() -> Self {
        Self { preset: "open_3x3".into(), layout: None, max_steps: Some(100), rewards: None }
    }
}

pub fn default_rewards() -> RewardMap {
    [
        ("WAIT", -0.1),
        ("MOVE", -1.0),
        ("MOVE:NO_EXIT", -5.0),
        ("MOVE:BLOCKED", -5.0),
        ("GET", 1.0),
        ("GET:NO_OBJECT", -2.0),
        ("GET:FULL", -2.0),
        ("DROP", 0.0),
        ("DROP:NO_OBJECT", -2.0),
        ("DROP:FULL", -2.0),
        ("PUSH", -1.0),
        ("PUSH:NO_OBJECT", -2.0),
        ("USE:NO_OBJECT", -2.0),
        ("ENTER:GOAL", 10.0),
    ]
    .into_iter()
    .collect()
}

fn internal(err: WorldError) -> EngineError {
    EngineError::Internal(err.to_string())
}

/// Accepts an integer id or an action name such as `"PUSH_EAST"`.
fn parse_action(value: &Json) -> Result<Action, EngineError> {
    if let Some(id) = value.as_u64() {
        let id = u8::try_from(id).map_err(|_| EngineError::Validation(format!("unknown action int: {id}")))?;
        return Action::try_from(id).map_err(|e| EngineError::Validation(e.to_string()));
    }
    if let Some(name) = value.as_str() {
        return name.parse().map_err(|e: gridworld_rs::ParseActionError| EngineError::Validation(e.to_string()));
    }
    Err(EngineError::Validation(format!("action must be an integer or a name, got {value}")))
}

fn actions_of(call: &ToolCall) -> Result<Vec<Action>, EngineError> {
    if let Some(action) = call.args.get("action") {
        return Ok(vec![parse_action(action)?]);
    }
    match call.args.get("actions").and_then(Json::as_array) {
        Some(list) if !list.is_empty() => list.iter().map(parse_action).collect(),
        _ => Err(EngineError::Validation("missing action".into())),
    }
}

pub struct GridWorldEnvironment {
    env: GridEnvironment,
}

impl GridWorldEnvironment {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let level = match config.layout {
            Some(rows) => Level { rows },
            None => preset_level(&config.preset)
                .ok_or_else(|| EngineError::Validation(format!("unknown preset: {}", config.preset)))?,
        };
        let state = level.to_world().map_err(|e| EngineError::Validation(format!("bad layout: {e}")))?;
        let env_config = EnvConfig { max_steps: config.max_steps, rewards: config.rewards.unwrap_or_else(default_rewards) };
        Ok(Self { env: GridEnvironment::new(state, env_config) })
    }

    pub fn engine(&self) -> &GridEnvironment {
        &self.env
    }

    fn observation(&self, extra: Json) -> Observation {
        let state = self.env.state();
        let position = state.position_of(ThingId::Agent).ok().flatten();
        let holding = state.agent().holding().and_then(|id| state.object(id).ok()).map(|o| o.name().to_string());
        let terminated = self.env.is_terminal();
        let truncated = self.env.is_truncated();
        let data = json!({
            "grid_text": self.env.render(),
            "agent_position": position.map(|(x, y)| [x, y]),
            "holding": holding,
            "num_env_steps": self.env.num_env_steps(),
            "max_steps": self.env.max_steps(),
            "terminated": terminated,
            "truncated": truncated,
            "reward_last": self.env.reward_last(),
            "total_reward": self.env.total_reward(),
            "extra": extra,
        });
        Observation { terminated, truncated, reward: self.env.reward_last(), data }
    }

    fn run(&mut self, actions: &[Action]) -> Result<Vec<StepOutcome>, EngineError> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for &action in actions {
            if self.env.is_finished() {
                break;
            }
            outcomes.push(self.env.step(action).map_err(internal)?);
        }
        Ok(outcomes)
    }
}

#[async_trait]
impl Environment for GridWorldEnvironment {
    async fn initialize(&mut self) -> Result<Observation, EngineError> {
        self.env.reset();
        Ok(self.observation(json!({ "event": "initialize" })))
    }

    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError> {
        if tool_calls.is_empty() {
            return Err(EngineError::Validation("no tool_calls provided".into()));
        }
        let mut applied = Vec::new();
        for call in &tool_calls {
            if call.tool != "interact" {
                return Err(EngineError::Validation(format!("unknown tool: {}", call.tool)));
            }
            let actions = actions_of(call)?;
            let outcomes = self.run(&actions)?;
            debug!(requested = actions.len(), applied = outcomes.len(), "interact");
            applied.extend(actions.iter().zip(&outcomes).map(|(action, out)| {
                json!({ "action": action.name(), "reward": out.reward, "disposition": out.disposition })
            }));
        }
        Ok(self.observation(json!({ "steps": applied })))
    }

    async fn checkpoint(&self) -> Result<Checkpoint, EngineError> {
        make_checkpoint(self, CHECKPOINT_VERSION).await
    }

    async fn restore(&mut self, checkpoint: &Checkpoint) -> Result<Observation, EngineError> {
        if checkpoint.engine != ENGINE_NAME {
            return Err(EngineError::Validation(format!("checkpoint is for engine {}", checkpoint.engine)));
        }
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(EngineError::Validation(format!("unsupported checkpoint version {}", checkpoint.version)));
        }
        let env: GridEnvironment = serde_json::from_value(checkpoint.data.clone())?;
        env.validate().map_err(|e| EngineError::Validation(format!("inconsistent checkpoint: {e}")))?;
        self.env = env;
        Ok(self.observation(json!({ "event": "restore" })))
    }

    async fn terminate(&mut self) -> Result<Observation, EngineError> {
        let mut obs = self.observation(json!({ "event": "terminate" }));
        obs.truncated = true;
        if let Some(map) = obs.data.as_object_mut() {
            map.insert("truncated".into(), Json::Bool(true));
        }
        Ok(obs)
    }
}

#[async_trait]
impl ReproducibleEngine for GridWorldEnvironment {
    async fn serialize_engine(&self) -> Result<Json, EngineError> {
        serde_json::to_value(&self.env).map_err(|e| EngineError::Internal(e.to_string()))
    }

    fn engine_name(&self) -> String {
        ENGINE_NAME.to_string()
    }
}

/// Registers the `"GridWorld"` factory; its config is a JSON [`Config`].
pub fn register_default_env() {
    register_environment_with_config(
        "GridWorld",
        Arc::new(|cfg: Option<Json>| -> Result<Box<dyn Environment>, EngineError> {
            let cfg: Config = match cfg {
                Some(v) => serde_json::from_value(v).map_err(|e| EngineError::Validation(format!("bad config: {e}")))?,
                None => Config::default(),
            };
            Ok(Box::new(GridWorldEnvironment::new(cfg)?))
        }),
    );
}
