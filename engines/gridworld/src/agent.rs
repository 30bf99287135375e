//! The agent and its composite actions.
//!
//! Each action is a short, fixed sequence of cell/object behavior calls
//! followed by reward resolution. The reward handed back is always a
//! concrete number.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::direction::Direction;
use crate::error::WorldError;
use crate::grid::CellId;
use crate::protocol::{Disposition, ObjectId, ThingId};
use crate::push::PushResult;
use crate::reward::keys;
use crate::world::World;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub(crate) cell: CellId,
    pub(crate) holding: Option<ObjectId>,
}

impl Agent {
    pub(crate) fn new(cell: CellId) -> Self {
        Self { cell, holding: None }
    }

    /// The agent always lives in a cell.
    pub fn cell(&self) -> CellId { self.cell }

    /// The one object in the agent's inventory, if any.
    pub fn holding(&self) -> Option<ObjectId> { self.holding }
}

/// Enumerated action space. Ids 0..=10 are the core actions; USE is 11.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Wait,
    Move(Direction),
    Get,
    Drop,
    Push(Direction),
    Use,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Wait,
        Action::Move(Direction::North),
        Action::Move(Direction::East),
        Action::Move(Direction::South),
        Action::Move(Direction::West),
        Action::Get,
        Action::Drop,
        Action::Push(Direction::North),
        Action::Push(Direction::East),
        Action::Push(Direction::South),
        Action::Push(Direction::West),
        Action::Use,
    ];

    pub fn id(self) -> u8 {
        match self {
            Action::Wait => 0,
            Action::Move(d) => 1 + dir_offset(d),
            Action::Get => 5,
            Action::Drop => 6,
            Action::Push(d) => 7 + dir_offset(d),
            Action::Use => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Wait => "WAIT",
            Action::Move(Direction::North) => "MOVE_NORTH",
            Action::Move(Direction::East) => "MOVE_EAST",
            Action::Move(Direction::South) => "MOVE_SOUTH",
            Action::Move(Direction::West) => "MOVE_WEST",
            Action::Get => "GET",
            Action::Drop => "DROP",
            Action::Push(Direction::North) => "PUSH_NORTH",
            Action::Push(Direction::East) => "PUSH_EAST",
            Action::Push(Direction::South) => "PUSH_SOUTH",
            Action::Push(Direction::West) => "PUSH_WEST",
            Action::Use => "USE",
        }
    }
}

fn dir_offset(d: Direction) -> u8 {
    match d {
        Direction::North => 0,
        Direction::East => 1,
        Direction::South => 2,
        Direction::West => 3,
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseActionError {
    #[error("invalid action id {0} (expected 0..=11)")]
    Id(u8),
    #[error("unknown action '{0}'")]
    Name(String),
}

impl TryFrom<u8> for Action {
    type Error = ParseActionError;
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Action::ALL.get(v as usize).copied().ok_or(ParseActionError::Id(v))
    }
}

impl FromStr for Action {
    type Err = ParseActionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.name() == upper)
            .ok_or_else(|| ParseActionError::Name(s.to_string()))
    }
}

/// Final result of a composite action.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub disposition: Disposition,
    pub reward: f64,
}

impl ActionOutcome {
    pub fn new(disposition: Disposition, reward: f64) -> Self {
        Self { disposition, reward }
    }

    pub fn proceed(reward: f64) -> Self {
        Self::new(Disposition::Continue, reward)
    }

    pub fn halt(reward: f64) -> Self {
        Self::new(Disposition::Halt, reward)
    }
}

impl World {
    /// Run one composite action to completion.
    pub fn execute(&mut self, action: Action) -> Result<ActionOutcome, WorldError> {
        let outcome = match action {
            Action::Wait => self.wait()?,
            Action::Move(direction) => self.move_agent(direction)?,
            Action::Get => self.get()?,
            Action::Drop => self.drop_held()?,
            Action::Push(direction) => self.push(direction)?,
            Action::Use => self.use_held()?,
        };
        debug!(action = action.name(), disposition = ?outcome.disposition, reward = outcome.reward, "action resolved");
        Ok(outcome)
    }

    fn wait(&mut self) -> Result<ActionOutcome, WorldError> {
        let cell = self.state.agent.cell;
        let outcome = self.cell_wait(cell, ThingId::Agent, None)?;
        Ok(ActionOutcome::new(outcome.disposition, self.rewards.resolve(outcome.reward, &[keys::WAIT])))
    }

    fn move_agent(&mut self, direction: Direction) -> Result<ActionOutcome, WorldError> {
        let origin = self.state.agent.cell;
        let outcome = self.cell_exit(origin, ThingId::Agent, direction, None)?;
        if self.state.agent.cell == origin {
            return Ok(ActionOutcome::halt(self.rewards.resolve(outcome.reward, &[keys::MOVE_NO_EXIT])));
        }
        let specific = keys::move_in(direction);
        let reward = self.rewards.resolve(outcome.reward, &[specific.as_str(), keys::MOVE]);
        Ok(ActionOutcome::new(outcome.disposition, reward))
    }

    fn get(&mut self) -> Result<ActionOutcome, WorldError> {
        let cell = self.state.agent.cell;
        let Some(target) = self.state.grid.cell(cell).portable_object() else {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::GET_NO_OBJECT])));
        };
        if self.state.agent.holding.is_some() {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::GET_FULL])));
        }
        let outcome = self.cell_get(cell, ThingId::Agent, target, None)?;
        if outcome.is_halt() {
            return Ok(ActionOutcome::halt(self.rewards.resolve(outcome.reward, &[keys::GET_FAILED])));
        }
        let specific = keys::object_key(keys::GET, self.state.object(target)?.name());
        let reward = self.rewards.resolve(outcome.reward, &[specific.as_str(), keys::GET_OBJECT, keys::GET]);
        Ok(ActionOutcome::proceed(reward))
    }

    fn drop_held(&mut self) -> Result<ActionOutcome, WorldError> {
        let Some(target) = self.state.agent.holding else {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::DROP_NO_OBJECT])));
        };
        let cell = self.state.agent.cell;
        let here = self.state.grid.cell(cell);
        let movable_clash = self.state.object(target)?.is_movable() && here.movable_object().is_some();
        if here.portable_object().is_some() || movable_clash {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::DROP_FULL])));
        }
        let outcome = self.cell_drop(cell, ThingId::Agent, target, None)?;
        if outcome.is_halt() {
            return Ok(ActionOutcome::halt(self.rewards.resolve(outcome.reward, &[keys::DROP_FAILED])));
        }
        let specific = keys::object_key(keys::DROP, self.state.object(target)?.name());
        let reward = self.rewards.resolve(outcome.reward, &[specific.as_str(), keys::DROP_OBJECT, keys::DROP]);
        Ok(ActionOutcome::proceed(reward))
    }

    fn use_held(&mut self) -> Result<ActionOutcome, WorldError> {
        let Some(held) = self.state.agent.holding else {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::USE_NO_OBJECT])));
        };
        let outcome = self.object_use(held, ThingId::Agent)?;
        Ok(ActionOutcome::new(outcome.disposition, outcome.reward.unwrap_or(0.0)))
    }

    fn push(&mut self, direction: Direction) -> Result<ActionOutcome, WorldError> {
        let origin = self.state.agent.cell;
        let ahead = self.state.grid.next_cell(origin, direction);
        let Some(target) = self.state.grid.cell(ahead).movable_object() else {
            return Ok(ActionOutcome::halt(self.rewards.resolve(None, &[keys::PUSH_NO_OBJECT])));
        };
        Ok(match self.cell_push(ahead, ThingId::Agent, target, direction, None)? {
            PushResult::Pushed(outcome) => {
                let specific = keys::push_in(direction);
                ActionOutcome::proceed(self.rewards.resolve(outcome.reward, &[specific.as_str(), keys::PUSH]))
            }
            PushResult::Vetoed(outcome) => ActionOutcome::halt(self.rewards.resolve(outcome.reward, &[keys::PUSH_FAILED])),
            PushResult::NoExit(outcome) => ActionOutcome::halt(self.rewards.resolve(outcome.reward, &[keys::MOVE_NO_EXIT])),
            PushResult::Diverted(outcome) => {
                let specific = keys::move_in(direction);
                let reward = self.rewards.resolve(outcome.reward, &[specific.as_str(), keys::MOVE]);
                ActionOutcome::new(outcome.disposition, reward)
            }
            PushResult::Blocked => ActionOutcome::halt(self.rewards.resolve(None, &[keys::MOVE_BLOCKED])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::WorldBuilder;
    use crate::object::{Object, ObjectKind};
    use crate::reward::RewardMap;

    fn rewards() -> RewardMap {
        [
            ("WAIT", -0.1),
            ("MOVE", -1.0),
            ("MOVE:NO_EXIT", -5.0),
            ("GET", 1.0),
            ("GET:NO_OBJECT", -2.0),
            ("GET:FULL", -3.0),
            ("GET:FAILED", -4.0),
            ("DROP", 0.5),
            ("DROP:NO_OBJECT", -2.0),
            ("DROP:FULL", -3.0),
            ("USE:NO_OBJECT", -6.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn action_ids_round_trip() {
        for (i, a) in Action::ALL.iter().enumerate() {
            assert_eq!(a.id() as usize, i);
            assert_eq!(Action::try_from(i as u8).unwrap(), *a);
            assert_eq!(a.name().parse::<Action>().unwrap(), *a);
        }
        assert_eq!(Action::try_from(12), Err(ParseActionError::Id(12)));
        assert_eq!("move_east".parse::<Action>().unwrap(), Action::Move(Direction::East));
        assert!("JUMP".parse::<Action>().is_err());
    }

    #[test]
    fn wait_uses_wait_key() {
        let state = WorldBuilder::new(1, 1).agent(0, 0).build().unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Wait).unwrap(), ActionOutcome::proceed(-0.1));
    }

    #[test]
    fn move_falls_back_to_generic_key() {
        let state = WorldBuilder::new(2, 2).agent(0, 0).build().unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Move(Direction::North)).unwrap(), ActionOutcome::proceed(-1.0));
        assert_eq!(world.state().position_of(ThingId::Agent).unwrap(), Some((0, 1)));
        assert_eq!(world.execute(Action::Move(Direction::North)).unwrap(), ActionOutcome::halt(-5.0));
    }

    #[test]
    fn get_checks_before_touching_the_cell() {
        let state = WorldBuilder::new(2, 1)
            .agent(0, 0)
            .object(0, 0, Object::item("key"))
            .object(1, 0, Object::item("gem"))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Get).unwrap(), ActionOutcome::proceed(1.0));
        world.execute(Action::Move(Direction::East)).unwrap();
        let before = world.save_state();
        assert_eq!(world.execute(Action::Get).unwrap(), ActionOutcome::halt(-3.0));
        let gem = world.state().object_by_name("gem").unwrap();
        assert_eq!(world.state().grid().cell(world.state().agent().cell()).portable_object(), Some(gem));
        assert_eq!(world.state().agent().holding(), before.state().agent().holding());
    }

    #[test]
    fn get_with_nothing_there() {
        let state = WorldBuilder::new(1, 1).agent(0, 0).build().unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Get).unwrap(), ActionOutcome::halt(-2.0));
    }

    #[test]
    fn trap_vetoes_get() {
        let state = WorldBuilder::new(1, 1)
            .agent(0, 0)
            .object(0, 0, Object::new("trap", ObjectKind::Trap))
            .object(0, 0, Object::item("key"))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Get).unwrap(), ActionOutcome::halt(-4.0));
        assert_eq!(world.state().agent().holding(), None);
        world.state().check_invariants().unwrap();
    }

    #[test]
    fn drop_round_trip() {
        let state = WorldBuilder::new(2, 1)
            .agent(0, 0)
            .object(0, 0, Object::item("key"))
            .object(1, 0, Object::item("gem"))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards().with("DROP:OBJECT[key]", 2.0));
        assert_eq!(world.execute(Action::Drop).unwrap(), ActionOutcome::halt(-2.0));
        world.execute(Action::Get).unwrap();
        world.execute(Action::Move(Direction::East)).unwrap();
        // gem already occupies the portable slot here
        assert_eq!(world.execute(Action::Drop).unwrap(), ActionOutcome::halt(-3.0));
        world.execute(Action::Move(Direction::West)).unwrap();
        assert_eq!(world.execute(Action::Drop).unwrap(), ActionOutcome::proceed(2.0));
        let key = world.state().object_by_name("key").unwrap();
        assert_eq!(world.state().position_of(ThingId::Object(key)).unwrap(), Some((0, 0)));
        assert_eq!(world.state().agent().holding(), None);
        world.state().check_invariants().unwrap();
    }

    #[test]
    fn use_needs_a_held_object() {
        let state = WorldBuilder::new(1, 1)
            .agent(0, 0)
            .object(0, 0, Object::item("key"))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards());
        assert_eq!(world.execute(Action::Use).unwrap(), ActionOutcome::halt(-6.0));
        world.execute(Action::Get).unwrap();
        assert_eq!(world.execute(Action::Use).unwrap(), ActionOutcome::halt(0.0));
    }

    #[test]
    fn carried_objects_travel_with_the_agent() {
        let state = WorldBuilder::new(3, 1)
            .agent(0, 0)
            .object(0, 0, Object::lantern("lamp"))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards());
        world.execute(Action::Get).unwrap();
        world.execute(Action::Move(Direction::East)).unwrap();
        world.execute(Action::Move(Direction::East)).unwrap();
        let lamp = world.state().object_by_name("lamp").unwrap();
        assert_eq!(world.state().position_of(ThingId::Object(lamp)).unwrap(), Some((2, 0)));
        assert_eq!(world.execute(Action::Use).unwrap().disposition, Disposition::Continue);
    }

    #[test]
    fn goal_reward_is_explicit_and_ends_the_episode() {
        let state = WorldBuilder::new(2, 1)
            .agent(0, 0)
            .object(1, 0, Object::new("goal", ObjectKind::Goal))
            .build()
            .unwrap();
        let mut world = World::new(state, rewards().with("MOVE:EAST", -1.0).with("ENTER:GOAL", 10.0));
        assert_eq!(world.execute(Action::Move(Direction::East)).unwrap(), ActionOutcome::proceed(10.0));
        assert!(world.state().is_terminal());
    }
}
