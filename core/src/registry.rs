use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde_json::Value as Json;

use crate::contract::{EngineError, Environment};

/// Config-aware factory for constructing environment instances.
pub type EnvConfigFactory = Arc<dyn Fn(Option<Json>) -> Result<Box<dyn Environment>, EngineError> + Send + Sync + 'static>;

static ENV_REGISTRY: OnceLock<Mutex<HashMap<String, EnvConfigFactory>>> = OnceLock::new();

fn registry() -> MutexGuard<'static, HashMap<String, EnvConfigFactory>> {
    // the map stays usable even if a factory panicked while it was held
    ENV_REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Register a factory that ignores config.
pub fn register_environment(name: &str, factory: Arc<dyn Fn() -> Box<dyn Environment> + Send + Sync + 'static>) {
    let f: EnvConfigFactory = Arc::new(move |_cfg: Option<Json>| Ok(factory()));
    register_environment_with_config(name, f);
}

/// Register a config-aware factory. Overwrites any existing entry.
pub fn register_environment_with_config(name: &str, factory: EnvConfigFactory) {
    registry().insert(name.to_string(), factory);
}

pub fn create_environment_with_config(name: &str, config: Option<Json>) -> Result<Box<dyn Environment>, EngineError> {
    let factory = registry()
        .get(name)
        .cloned()
        .ok_or_else(|| EngineError::NotFound(format!("unsupported environment: {name}")))?;
    factory(config)
}

pub fn create_environment(name: &str) -> Result<Box<dyn Environment>, EngineError> {
    create_environment_with_config(name, None)
}

pub fn list_environments() -> Vec<String> {
    let mut names: Vec<String> = registry().keys().cloned().collect();
    names.sort();
    names
}
