//! Episode harness: reset/step over a [`World`] with step counting and
//! optional truncation.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::Action;
use crate::error::WorldError;
use crate::protocol::Disposition;
use crate::render::render_text;
use crate::reward::RewardMap;
use crate::world::{Snapshot, World, WorldState};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Truncate the episode after this many steps.
    #[serde(default)]
    pub max_steps: Option<u32>,
    #[serde(default)]
    pub rewards: RewardMap,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub reward: f64,
    pub disposition: Disposition,
    pub terminated: bool,
    pub truncated: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridEnvironment {
    initial: WorldState,
    world: World,
    max_steps: Option<u32>,
    num_env_steps: u32,
    reward_last: f64,
    total_reward: f64,
    truncated: bool,
}

impl GridEnvironment {
    pub fn new(initial: WorldState, config: EnvConfig) -> Self {
        let world = World::new(initial.clone(), config.rewards);
        Self {
            initial,
            world,
            max_steps: config.max_steps,
            num_env_steps: 0,
            reward_last: 0.0,
            total_reward: 0.0,
            truncated: false,
        }
    }

    /// Back to the initial layout with counters cleared.
    pub fn reset(&mut self) -> &WorldState {
        self.world.restore_state(Snapshot::from(self.initial.clone()));
        self.num_env_steps = 0;
        self.reward_last = 0.0;
        self.total_reward = 0.0;
        self.truncated = false;
        self.world.state()
    }

    pub fn step(&mut self, action: Action) -> Result<StepOutcome, WorldError> {
        if self.is_finished() {
            warn!(action = action.name(), steps = self.num_env_steps, "step on a finished episode ignored");
            self.reward_last = 0.0;
            return Ok(StepOutcome {
                reward: 0.0,
                disposition: Disposition::Halt,
                terminated: self.is_terminal(),
                truncated: self.truncated,
            });
        }
        let outcome = self.world.execute(action)?;
        if cfg!(debug_assertions) {
            self.world.state().check_invariants()?;
        }
        self.num_env_steps = self.num_env_steps.saturating_add(1);
        self.reward_last = outcome.reward;
        self.total_reward += outcome.reward;
        let terminated = self.is_terminal();
        self.truncated = !terminated && self.max_steps.is_some_and(|max| self.num_env_steps >= max);
        Ok(StepOutcome { reward: outcome.reward, disposition: outcome.disposition, terminated, truncated: self.truncated })
    }

    pub fn is_terminal(&self) -> bool {
        self.world.state().is_terminal()
    }

    /// Terminal or truncated.
    pub fn is_finished(&self) -> bool {
        self.is_terminal() || self.truncated
    }

    /// Consistency of both the live and the initial state. Run this on
    /// harnesses that were deserialized rather than built.
    pub fn validate(&self) -> Result<(), WorldError> {
        self.initial.check_invariants()?;
        self.world.state().check_invariants()
    }

    pub fn state(&self) -> &WorldState { self.world.state() }
    pub fn world(&self) -> &World { &self.world }
    pub fn world_mut(&mut self) -> &mut World { &mut self.world }
    pub fn num_env_steps(&self) -> u32 { self.num_env_steps }
    pub fn max_steps(&self) -> Option<u32> { self.max_steps }
    pub fn reward_last(&self) -> f64 { self.reward_last }
    pub fn total_reward(&self) -> f64 { self.total_reward }
    pub fn is_truncated(&self) -> bool { self.truncated }

    pub fn save_state(&self) -> Snapshot {
        self.world.save_state()
    }

    /// Replaces the world state only; step counters and rewards stand.
    pub fn restore_state(&mut self, snapshot: Snapshot) {
        self.world.restore_state(snapshot);
    }

    pub fn render(&self) -> String {
        render_text(self.world.state())
    }
}
