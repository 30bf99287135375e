//! Pure grid-world engine.
//! - Cells, objects and the agent cooperate through one behavior protocol
//!   (WAIT, ENTER, EXIT, GET, DROP, PUSH, USE) dispatched in insertion order
//! - Composite actions resolve to a disposition and a concrete reward
//! - Two-body pushes are atomic: committed whole or rolled back
//! - World state is plain data (serde) and cheap to snapshot

mod agent;
mod cell;
mod direction;
mod environment;
mod error;
mod grid;
mod level;
mod object;
mod protocol;
mod push;
mod render;
mod reward;
mod world;

pub use agent::{Action, ActionOutcome, Agent, ParseActionError};
pub use cell::{Cell, CellKind};
pub use direction::Direction;
pub use environment::{EnvConfig, GridEnvironment, StepOutcome};
pub use error::WorldError;
pub use grid::{CellId, Grid};
pub use level::{Level, LevelError, WorldBuilder};
pub use object::{Object, ObjectKind, MAX_REDIRECTS};
pub use protocol::{Container, Disposition, ObjectId, Outcome, Reward, ThingId};
pub use push::PushResult;
pub use render::{cell_glyph, render_text};
pub use reward::{keys, RewardMap};
pub use world::{Snapshot, World, WorldState};
