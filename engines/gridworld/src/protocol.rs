//! Shared vocabulary of the behavior protocol: dispositions, running
//! rewards and the handles used to address things inside a world.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::CellId;

/// Signal returned by every behavior call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// No objection; dispatch moves on to the next entity or the default handling.
    Continue,
    /// Fully handled or blocked; dispatch stops and the reward is final.
    Halt,
}

/// Running reward threaded through a dispatch chain.
/// `None` until some behavior produces an explicit value.
pub type Reward = Option<f64>;

/// Result of a single behavior call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Outcome {
    pub disposition: Disposition,
    pub reward: Reward,
}

impl Outcome {
    pub fn proceed(reward: Reward) -> Self {
        Self { disposition: Disposition::Continue, reward }
    }

    pub fn halt(reward: Reward) -> Self {
        Self { disposition: Disposition::Halt, reward }
    }

    #[inline]
    pub fn is_halt(&self) -> bool {
        self.disposition == Disposition::Halt
    }
}

/// Index of an object in the world's object arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that has a container: the agent or an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingId {
    Agent,
    Object(ObjectId),
}

impl ThingId {
    pub fn object(self) -> Option<ObjectId> {
        match self {
            ThingId::Object(id) => Some(id),
            ThingId::Agent => None,
        }
    }
}

/// Non-owning back-reference from a thing to whatever holds it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Container {
    Cell(CellId),
    /// The agent's one-slot inventory.
    Agent,
}
