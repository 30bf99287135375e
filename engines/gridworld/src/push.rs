//! Two-body push: the agent steps into the pushed object's cell while the
//! object steps one cell further, or neither moves.

use tracing::debug;

use crate::direction::Direction;
use crate::error::WorldError;
use crate::grid::CellId;
use crate::protocol::{ObjectId, Outcome, Reward, ThingId};
use crate::world::{World, WorldState};

/// How a push attempt ended. Only `Pushed` moved both bodies; `Diverted`
/// moved the pusher alone; everything else left the world untouched.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PushResult {
    Pushed(Outcome),
    /// Another object in the target's cell, or the target itself, refused.
    Vetoed(Outcome),
    /// The pusher could not leave its cell.
    NoExit(Outcome),
    /// The pusher moved but was sent somewhere other than the target's cell.
    Diverted(Outcome),
    /// The target could not advance and the attempt was rolled back.
    Blocked,
}

/// Owns the pre-push copy of the state for the duration of one attempt.
struct PushTransaction {
    snapshot: WorldState,
}

impl PushTransaction {
    fn begin(state: &WorldState) -> Self {
        Self { snapshot: state.clone() }
    }

    fn commit(self) {}

    fn rollback(self, state: &mut WorldState) {
        *state = self.snapshot;
    }
}

impl World {
    /// PUSH of the movable `target` in `cell` by `actor`, who stands in the
    /// neighboring cell on the side opposite `direction`. The other objects
    /// in `cell` may veto, then the target itself.
    pub fn cell_push(
        &mut self,
        cell: CellId,
        actor: ThingId,
        target: ObjectId,
        direction: Direction,
        reward: Reward,
    ) -> Result<PushResult, WorldError> {
        if self.is_solid(cell) {
            return Ok(PushResult::Vetoed(Outcome::halt(reward)));
        }
        let outcome = self.call_objects(cell, Some(target), reward, |world, object, reward| {
            world.object_push(object, actor, target, direction, reward)
        })?;
        if outcome.is_halt() {
            return Ok(PushResult::Vetoed(outcome));
        }
        let outcome = self.object_push(target, actor, target, direction, outcome.reward)?;
        if outcome.is_halt() {
            return Ok(PushResult::Vetoed(outcome));
        }

        let origin = self.state.cell_of(actor)?;
        let transaction = PushTransaction::begin(&self.state);
        match self.attempt_push(origin, cell, actor, target, direction, outcome.reward) {
            Ok(PushResult::Blocked) => {
                transaction.rollback(&mut self.state);
                debug!(%target, ?direction, "push blocked, rolled back");
                Ok(PushResult::Blocked)
            }
            Ok(result) => {
                transaction.commit();
                if let PushResult::Pushed(_) = result {
                    debug!(%target, ?direction, "push committed");
                }
                Ok(result)
            }
            Err(err) => {
                transaction.rollback(&mut self.state);
                Err(err)
            }
        }
    }

    fn attempt_push(
        &mut self,
        origin: CellId,
        target_cell: CellId,
        actor: ThingId,
        target: ObjectId,
        direction: Direction,
        reward: Reward,
    ) -> Result<PushResult, WorldError> {
        self.pushing = Some(target);
        let moved = self.cell_exit(origin, actor, direction, reward);
        self.pushing = None;
        let moved = moved?;

        let actor_cell = self.state.cell_of(actor)?;
        if actor_cell == origin {
            return Ok(PushResult::NoExit(moved));
        }
        if actor_cell != target_cell {
            return Ok(PushResult::Diverted(moved));
        }

        let pushed = self.cell_exit(target_cell, ThingId::Object(target), direction, moved.reward)?;
        if pushed.is_halt() || self.state.cell_of(ThingId::Object(target))? == actor_cell {
            return Ok(PushResult::Blocked);
        }
        Ok(PushResult::Pushed(pushed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::WorldBuilder;
    use crate::object::{Object, ObjectKind};
    use crate::reward::RewardMap;

    fn world(width: usize, extra: impl FnOnce(WorldBuilder) -> WorldBuilder) -> (World, ObjectId) {
        let builder = WorldBuilder::new(width, 1).agent(0, 0).object(1, 0, Object::crate_box("box"));
        let state = extra(builder).build().unwrap();
        let boxed = state.object_by_name("box").unwrap();
        (World::new(state, RewardMap::new()), boxed)
    }

    fn positions(world: &World, boxed: ObjectId) -> (Option<(i32, i32)>, Option<(i32, i32)>) {
        let state = world.state();
        (state.position_of(ThingId::Agent).unwrap(), state.position_of(ThingId::Object(boxed)).unwrap())
    }

    #[test]
    fn both_bodies_advance() {
        let (mut world, boxed) = world(3, |b| b);
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, None).unwrap();
        assert_eq!(result, PushResult::Pushed(Outcome::proceed(None)));
        assert_eq!(positions(&world, boxed), (Some((1, 0)), Some((2, 0))));
        assert_eq!(world.pushing, None);
        world.state().check_invariants().unwrap();
    }

    #[test]
    fn boundary_rolls_back() {
        let (mut world, boxed) = world(2, |b| b);
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, None).unwrap();
        assert_eq!(result, PushResult::Blocked);
        assert_eq!(positions(&world, boxed), (Some((0, 0)), Some((1, 0))));
        world.state().check_invariants().unwrap();
    }

    #[test]
    fn second_crate_blocks() {
        let (mut world, boxed) = world(3, |b| b.object(2, 0, Object::crate_box("other")));
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, None).unwrap();
        assert_eq!(result, PushResult::Blocked);
        assert_eq!(positions(&world, boxed), (Some((0, 0)), Some((1, 0))));
    }

    #[test]
    fn fence_on_the_pushers_side_stops_the_agent() {
        let (mut world, boxed) = world(3, |b| b.object(0, 0, Object::new("fence", ObjectKind::Fence { side: Direction::East })));
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, Some(-2.0)).unwrap();
        assert_eq!(result, PushResult::NoExit(Outcome::halt(Some(-2.0))));
        assert_eq!(positions(&world, boxed), (Some((0, 0)), Some((1, 0))));
    }

    #[test]
    fn portal_in_front_diverts_the_pusher() {
        let (mut world, boxed) = world(4, |b| b.object(1, 0, Object::new("portal", ObjectKind::Portal { destination: (3, 0) })));
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, None).unwrap();
        assert!(matches!(result, PushResult::Diverted(_)));
        assert_eq!(positions(&world, boxed), (Some((3, 0)), Some((1, 0))));
    }

    #[test]
    fn trap_under_the_crate_vetoes() {
        let (mut world, boxed) = world(3, |b| b.object(1, 0, Object::new("trap", ObjectKind::Trap)));
        let at = world.state().cell_of(ThingId::Object(boxed)).unwrap();
        let result = world.cell_push(at, ThingId::Agent, boxed, Direction::East, None).unwrap();
        assert_eq!(result, PushResult::Vetoed(Outcome::halt(None)));
        assert_eq!(positions(&world, boxed), (Some((0, 0)), Some((1, 0))));
    }

    #[test]
    fn crate_keeps_the_agent_out_when_not_pushed() {
        let (mut world, boxed) = world(3, |b| b);
        let origin = world.state().agent().cell();
        let outcome = world.cell_exit(origin, ThingId::Agent, Direction::East, None).unwrap();
        assert!(outcome.is_halt());
        assert_eq!(positions(&world, boxed), (Some((0, 0)), Some((1, 0))));
    }
}
