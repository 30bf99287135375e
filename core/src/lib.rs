//! Environment contract shared by grid-world adapters: tool calls in,
//! observations out, checkpoints for reproducibility, and a process-wide
//! registry of named environment factories.

mod contract;
mod registry;

pub use contract::{make_checkpoint, Checkpoint, EngineError, Environment, Observation, ReproducibleEngine, ToolCall};
pub use registry::{
    create_environment, create_environment_with_config, list_environments, register_environment,
    register_environment_with_config, EnvConfigFactory,
};
