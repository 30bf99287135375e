//! Objects and their side of the behavior protocol.
//!
//! Every behavior defaults to `Continue` with the reward untouched. The
//! concrete kinds below override the few behaviors they care about; all of
//! them are resolved through the single `match` in each protocol method.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::direction::Direction;
use crate::error::WorldError;
use crate::grid::CellId;
use crate::protocol::{Container, ObjectId, Outcome, Reward, ThingId};
use crate::reward::keys;
use crate::world::World;

/// Nested portal hops allowed within one action.
pub const MAX_REDIRECTS: usize = 8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Protocol defaults only.
    Inert,
    /// Solid pushable body: keeps the agent out unless the agent is pushing
    /// this very crate.
    Crate,
    /// Stops anything else in its cell from being picked up or pushed away.
    Trap,
    /// Closes one side of its cell.
    Fence { side: Direction },
    /// Sends whatever enters its cell on to `destination`.
    Portal { destination: (i32, i32) },
    /// Marks the cell the agent has to reach. Nothing can be dropped on it.
    Goal,
    /// Usable light; USE toggles it.
    Lantern { lit: bool },
}

impl ObjectKind {
    pub fn glyph(&self) -> char {
        match self {
            ObjectKind::Inert => 'o',
            ObjectKind::Crate => 'B',
            ObjectKind::Trap => '^',
            ObjectKind::Fence { side: Direction::North | Direction::South } => '-',
            ObjectKind::Fence { .. } => '|',
            ObjectKind::Portal { .. } => 'O',
            ObjectKind::Goal => 'G',
            ObjectKind::Lantern { lit: true } => '*',
            ObjectKind::Lantern { lit: false } => 'L',
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Object {
    name: String,
    kind: ObjectKind,
    container: Container,
    portable: bool,
    movable: bool,
    visible: bool,
    glyph: Option<char>,
}

impl Object {
    /// A visible, fixed object. It has no place until a builder puts it somewhere.
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            container: Container::Cell(CellId::Limbo),
            portable: false,
            movable: false,
            visible: true,
            glyph: None,
        }
    }

    /// Portable object with no behavior of its own, such as a key.
    pub fn item(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Inert).portable()
    }

    pub fn crate_box(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Crate).movable()
    }

    pub fn lantern(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Lantern { lit: false }).portable()
    }

    pub fn portable(mut self) -> Self {
        self.portable = true;
        self
    }

    pub fn movable(mut self) -> Self {
        self.movable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_glyph(mut self, glyph: char) -> Self {
        self.glyph = Some(glyph);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> &ObjectKind { &self.kind }
    pub fn container(&self) -> Container { self.container }
    pub fn is_portable(&self) -> bool { self.portable }
    pub fn is_movable(&self) -> bool { self.movable }
    pub fn is_visible(&self) -> bool { self.visible }

    pub fn glyph(&self) -> char {
        self.glyph.unwrap_or_else(|| self.kind.glyph())
    }

    pub(crate) fn set_container(&mut self, container: Container) {
        self.container = container;
    }
}

impl World {
    fn kind_of(&self, object: ObjectId) -> Result<ObjectKind, WorldError> {
        Ok(self.state.object(object)?.kind.clone())
    }

    pub fn object_wait(&mut self, _object: ObjectId, _actor: ThingId, reward: Reward) -> Result<Outcome, WorldError> {
        Ok(Outcome::proceed(reward))
    }

    pub fn object_exit(&mut self, object: ObjectId, _thing: ThingId, direction: Direction, reward: Reward) -> Result<Outcome, WorldError> {
        Ok(match self.kind_of(object)? {
            ObjectKind::Fence { side } if side == direction => Outcome::halt(reward),
            _ => Outcome::proceed(reward),
        })
    }

    pub fn object_enter(
        &mut self,
        object: ObjectId,
        thing: ThingId,
        origin: CellId,
        from: Direction,
        reward: Reward,
    ) -> Result<Outcome, WorldError> {
        if let ThingId::Object(other) = thing {
            // two bodies of the same class never share a cell
            let (mine, theirs) = (self.state.object(object)?, self.state.object(other)?);
            if (mine.is_movable() && theirs.is_movable()) || (mine.is_portable() && theirs.is_portable()) {
                return Ok(Outcome::halt(reward));
            }
        }
        match self.kind_of(object)? {
            ObjectKind::Fence { side } if side == from => Ok(Outcome::halt(reward)),
            ObjectKind::Crate if thing == ThingId::Agent && self.pushing != Some(object) => Ok(Outcome::halt(reward)),
            ObjectKind::Portal { destination } => self.redirect(object, destination, thing, origin, from, reward),
            ObjectKind::Goal if thing == ThingId::Agent => {
                Ok(Outcome::proceed(self.rewards.get(keys::ENTER_GOAL).or(reward)))
            }
            _ => Ok(Outcome::proceed(reward)),
        }
    }

    fn redirect(
        &mut self,
        portal: ObjectId,
        destination: (i32, i32),
        thing: ThingId,
        origin: CellId,
        from: Direction,
        reward: Reward,
    ) -> Result<Outcome, WorldError> {
        let here = self.state.cell_of(ThingId::Object(portal))?;
        let target = self.state.grid.at(destination.0, destination.1);
        if target == here {
            return Ok(Outcome::proceed(reward));
        }
        if self.redirects >= MAX_REDIRECTS {
            return Err(WorldError::RedirectLimit { limit: MAX_REDIRECTS });
        }
        self.redirects += 1;
        let outcome = self.cell_enter(target, thing, origin, from, reward);
        self.redirects -= 1;
        let outcome = outcome?;
        trace!(%portal, ?thing, ?target, moved = !outcome.is_halt(), "portal redirected entry");
        // entry into this cell is settled either way
        Ok(Outcome::halt(outcome.reward))
    }

    pub fn object_get(&mut self, object: ObjectId, _actor: ThingId, target: ObjectId, reward: Reward) -> Result<Outcome, WorldError> {
        Ok(match self.kind_of(object)? {
            ObjectKind::Trap if target != object => Outcome::halt(self.rewards.get(keys::GET_TRAPPED).or(reward)),
            _ => Outcome::proceed(reward),
        })
    }

    pub fn object_drop(&mut self, object: ObjectId, _actor: ThingId, target: ObjectId, reward: Reward) -> Result<Outcome, WorldError> {
        Ok(match self.kind_of(object)? {
            ObjectKind::Goal if target != object => Outcome::halt(reward),
            _ => Outcome::proceed(reward),
        })
    }

    pub fn object_push(
        &mut self,
        object: ObjectId,
        _actor: ThingId,
        target: ObjectId,
        _direction: Direction,
        reward: Reward,
    ) -> Result<Outcome, WorldError> {
        Ok(match self.kind_of(object)? {
            ObjectKind::Trap if target != object => Outcome::halt(reward),
            _ => Outcome::proceed(reward),
        })
    }

    /// USE has no chain: only the carried object is asked. Objects that do
    /// not override it halt with zero reward.
    pub fn object_use(&mut self, object: ObjectId, _actor: ThingId) -> Result<Outcome, WorldError> {
        match self.kind_of(object)? {
            ObjectKind::Lantern { lit } => {
                let obj = self.state.object_mut(object)?;
                obj.kind = ObjectKind::Lantern { lit: !lit };
                let specific = keys::object_key(keys::USE, obj.name());
                let reward = self.rewards.resolve(None, &[specific.as_str(), keys::USE_OBJECT, keys::USE]);
                Ok(Outcome::proceed(Some(reward)))
            }
            _ => Ok(Outcome::halt(Some(0.0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::WorldBuilder;
    use crate::reward::RewardMap;

    #[test]
    fn builders_set_flags() {
        let key = Object::item("key");
        assert!(key.is_portable() && !key.is_movable() && key.is_visible());
        assert_eq!(key.glyph(), 'o');
        let boxed = Object::crate_box("box");
        assert!(boxed.is_movable() && !boxed.is_portable());
        assert_eq!(boxed.glyph(), 'B');
        assert_eq!(Object::item("gem").with_glyph('*').glyph(), '*');
        assert!(!Object::item("ghost").hidden().is_visible());
    }

    #[test]
    fn defaults_continue_with_reward_unchanged() {
        let state = WorldBuilder::new(1, 1).agent(0, 0).object(0, 0, Object::item("key")).build().unwrap();
        let mut world = World::new(state, RewardMap::new());
        let key = ObjectId(0);
        assert_eq!(world.object_wait(key, ThingId::Agent, Some(1.0)).unwrap(), Outcome::proceed(Some(1.0)));
        assert_eq!(world.object_exit(key, ThingId::Agent, Direction::East, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_get(key, ThingId::Agent, key, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_drop(key, ThingId::Agent, key, Some(-1.0)).unwrap(), Outcome::proceed(Some(-1.0)));
        assert_eq!(world.object_push(key, ThingId::Agent, key, Direction::North, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_use(key, ThingId::Agent).unwrap(), Outcome::halt(Some(0.0)));
    }

    #[test]
    fn trap_only_vetoes_other_objects() {
        let state = WorldBuilder::new(1, 1)
            .agent(0, 0)
            .object(0, 0, Object::new("trap", ObjectKind::Trap).portable())
            .build()
            .unwrap();
        let rewards: RewardMap = [(keys::GET_TRAPPED, -2.0)].into_iter().collect();
        let mut world = World::new(state, rewards);
        let trap = ObjectId(0);
        assert_eq!(world.object_get(trap, ThingId::Agent, trap, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_get(trap, ThingId::Agent, ObjectId(7), None).unwrap(), Outcome::halt(Some(-2.0)));
    }

    #[test]
    fn trap_anchors_and_goal_refuses_drops() {
        let state = WorldBuilder::new(1, 1)
            .agent(0, 0)
            .object(0, 0, Object::new("trap", ObjectKind::Trap))
            .object(0, 0, Object::new("goal", ObjectKind::Goal))
            .build()
            .unwrap();
        let mut world = World::new(state, RewardMap::new());
        let (trap, goal, other) = (ObjectId(0), ObjectId(1), ObjectId(7));
        assert_eq!(world.object_push(trap, ThingId::Agent, other, Direction::East, None).unwrap(), Outcome::halt(None));
        assert_eq!(world.object_push(trap, ThingId::Agent, trap, Direction::East, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_drop(goal, ThingId::Agent, other, Some(1.0)).unwrap(), Outcome::halt(Some(1.0)));
        assert_eq!(world.object_drop(goal, ThingId::Agent, goal, None).unwrap(), Outcome::proceed(None));
        assert_eq!(world.object_drop(trap, ThingId::Agent, other, None).unwrap(), Outcome::proceed(None));
    }

    #[test]
    fn lantern_toggles_on_use() {
        let state = WorldBuilder::new(1, 1).agent(0, 0).object(0, 0, Object::lantern("lamp")).build().unwrap();
        let rewards: RewardMap = [("USE:OBJECT[lamp]", 0.5), ("USE", 0.1)].into_iter().collect();
        let mut world = World::new(state, rewards);
        let lamp = ObjectId(0);
        assert_eq!(world.object_use(lamp, ThingId::Agent).unwrap(), Outcome::proceed(Some(0.5)));
        assert_eq!(world.state().object(lamp).unwrap().kind(), &ObjectKind::Lantern { lit: true });
        assert_eq!(world.state().object(lamp).unwrap().glyph(), '*');
        world.object_use(lamp, ThingId::Agent).unwrap();
        assert_eq!(world.state().object(lamp).unwrap().kind(), &ObjectKind::Lantern { lit: false });
    }

    #[test]
    fn chained_portals_hit_the_redirect_limit() {
        let state = WorldBuilder::new(3, 1)
            .agent(0, 0)
            .object(1, 0, Object::new("a", ObjectKind::Portal { destination: (2, 0) }))
            .object(2, 0, Object::new("b", ObjectKind::Portal { destination: (1, 0) }))
            .build()
            .unwrap();
        let mut world = World::new(state, RewardMap::new());
        let start = world.state().grid().at(0, 0);
        let err = world.cell_exit(start, ThingId::Agent, Direction::East, None).unwrap_err();
        assert_eq!(err, WorldError::RedirectLimit { limit: MAX_REDIRECTS });
    }
}
