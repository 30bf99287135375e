//! Grid cells: containment bookkeeping and the cell side of the behavior
//! protocol.
//!
//! A cell answers every protocol call by walking its objects in insertion
//! order. The first object to halt ends the walk and its reward is final;
//! when nobody halts the cell applies its own default handling (moving the
//! thing in, handing the target over, and so on).

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::direction::Direction;
use crate::error::WorldError;
use crate::grid::CellId;
use crate::protocol::{Container, ObjectId, Outcome, Reward, ThingId};
use crate::world::World;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Open,
    /// In-grid cell that behaves like the boundary.
    Wall,
    Boundary,
    Limbo,
}

impl CellKind {
    /// Solid cells halt every protocol call and never take part in movement.
    pub fn is_solid(self) -> bool {
        !matches!(self, CellKind::Open)
    }

    pub fn glyph(self) -> char {
        match self {
            CellKind::Open => '.',
            CellKind::Wall | CellKind::Boundary => '#',
            CellKind::Limbo => ' ',
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    kind: CellKind,
    position: Option<(i32, i32)>,
    inventory: Vec<ThingId>,
    // Denormalized views into `inventory`.
    agent: bool,
    portable_object: Option<ObjectId>,
    movable_object: Option<ObjectId>,
}

impl Cell {
    pub(crate) fn new(kind: CellKind, position: Option<(i32, i32)>) -> Self {
        Self { kind, position, inventory: Vec::new(), agent: false, portable_object: None, movable_object: None }
    }

    pub fn kind(&self) -> CellKind { self.kind }

    pub(crate) fn set_kind(&mut self, kind: CellKind) { self.kind = kind; }

    /// Grid coordinates; `None` for boundary and limbo.
    pub fn position(&self) -> Option<(i32, i32)> { self.position }

    pub fn glyph(&self) -> char { self.kind.glyph() }

    /// Things in this cell in insertion order. Limbo always looks empty.
    pub fn inventory(&self) -> &[ThingId] {
        if self.kind == CellKind::Limbo { &[] } else { &self.inventory }
    }

    /// Raw inventory, limbo included.
    pub(crate) fn contents(&self) -> &[ThingId] { &self.inventory }

    pub fn has_agent(&self) -> bool { self.agent }
    pub fn portable_object(&self) -> Option<ObjectId> { self.portable_object }
    pub fn movable_object(&self) -> Option<ObjectId> { self.movable_object }

    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.inventory().iter().filter_map(|t| t.object())
    }

    pub(crate) fn contains(&self, thing: ThingId) -> bool {
        self.inventory.contains(&thing)
    }

    pub(crate) fn insert_agent(&mut self, id: CellId) -> Result<(), WorldError> {
        match self.kind {
            CellKind::Limbo => {}
            CellKind::Open => {
                if self.agent {
                    return Err(WorldError::AgentOccupied { cell: id });
                }
                self.agent = true;
            }
            CellKind::Wall | CellKind::Boundary => {
                return Err(WorldError::NotPlaceable { thing: ThingId::Agent, container: Container::Cell(id) });
            }
        }
        self.inventory.push(ThingId::Agent);
        Ok(())
    }

    pub(crate) fn insert_object(&mut self, id: CellId, object: ObjectId, portable: bool, movable: bool) -> Result<(), WorldError> {
        match self.kind {
            CellKind::Limbo => {}
            CellKind::Open => {
                if let (true, Some(existing)) = (portable, self.portable_object) {
                    return Err(WorldError::PortableOccupied { cell: id, existing, incoming: object });
                }
                if let (true, Some(existing)) = (movable, self.movable_object) {
                    return Err(WorldError::MovableOccupied { cell: id, existing, incoming: object });
                }
                if portable { self.portable_object = Some(object); }
                if movable { self.movable_object = Some(object); }
            }
            CellKind::Wall | CellKind::Boundary => {
                return Err(WorldError::NotPlaceable { thing: ThingId::Object(object), container: Container::Cell(id) });
            }
        }
        self.inventory.push(ThingId::Object(object));
        Ok(())
    }

    /// Returns false when `thing` was not here.
    pub(crate) fn remove(&mut self, thing: ThingId) -> bool {
        let Some(pos) = self.inventory.iter().position(|t| *t == thing) else {
            return false;
        };
        self.inventory.remove(pos);
        match thing {
            ThingId::Agent => self.agent = false,
            ThingId::Object(id) => {
                if self.portable_object == Some(id) { self.portable_object = None; }
                if self.movable_object == Some(id) { self.movable_object = None; }
            }
        }
        true
    }
}

impl World {
    /// Run `behavior` on every object in `cell` except `skip`, stopping at the first halt.
    pub(crate) fn call_objects<F>(&mut self, cell: CellId, skip: Option<ObjectId>, reward: Reward, mut behavior: F) -> Result<Outcome, WorldError>
    where
        F: FnMut(&mut World, ObjectId, Reward) -> Result<Outcome, WorldError>,
    {
        let objects: Vec<ObjectId> = self.state.grid.cell(cell).objects().filter(|o| Some(*o) != skip).collect();
        let mut outcome = Outcome::proceed(reward);
        for object in objects {
            outcome = behavior(self, object, outcome.reward)?;
            if outcome.is_halt() {
                trace!(%object, ?cell, reward = ?outcome.reward, "object halted dispatch");
                break;
            }
        }
        Ok(outcome)
    }

    pub(crate) fn is_solid(&self, cell: CellId) -> bool {
        self.state.grid.cell(cell).kind().is_solid()
    }

    pub fn cell_wait(&mut self, cell: CellId, actor: ThingId, reward: Reward) -> Result<Outcome, WorldError> {
        if self.is_solid(cell) {
            return Ok(Outcome::halt(reward));
        }
        self.call_objects(cell, None, reward, |world, object, reward| world.object_wait(object, actor, reward))
    }

    /// Leave `cell` heading `direction`; on success the neighbor's ENTER runs
    /// and has already moved `thing` when this returns.
    pub fn cell_exit(&mut self, cell: CellId, thing: ThingId, direction: Direction, reward: Reward) -> Result<Outcome, WorldError> {
        if self.is_solid(cell) {
            return Ok(Outcome::halt(reward));
        }
        let outcome = self.call_objects(cell, thing.object(), reward, |world, object, reward| {
            world.object_exit(object, thing, direction, reward)
        })?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        let destination = self.state.grid.next_cell(cell, direction);
        self.cell_enter(destination, thing, cell, direction.opposite(), outcome.reward)
    }

    /// `from` is the side of `cell` the thing arrives through.
    pub fn cell_enter(&mut self, cell: CellId, thing: ThingId, origin: CellId, from: Direction, reward: Reward) -> Result<Outcome, WorldError> {
        if self.is_solid(cell) {
            return Ok(Outcome::halt(reward));
        }
        let outcome = self.call_objects(cell, thing.object(), reward, |world, object, reward| {
            world.object_enter(object, thing, origin, from, reward)
        })?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        self.state.transfer(thing, Container::Cell(cell))?;
        Ok(outcome)
    }

    /// Every other object gets a say first, then the target itself. On
    /// success the target is handed from the cell to the agent's inventory.
    pub fn cell_get(&mut self, cell: CellId, actor: ThingId, target: ObjectId, reward: Reward) -> Result<Outcome, WorldError> {
        if self.is_solid(cell) {
            return Ok(Outcome::halt(reward));
        }
        let thing = ThingId::Object(target);
        if !self.state.grid.cell(cell).contains(thing) {
            return Err(WorldError::ContainerMismatch { thing, container: Container::Cell(cell) });
        }
        let outcome = self.call_objects(cell, Some(target), reward, |world, object, reward| {
            world.object_get(object, actor, target, reward)
        })?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        let outcome = self.object_get(target, actor, target, outcome.reward)?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        self.state.transfer(thing, Container::Agent)?;
        Ok(outcome)
    }

    /// Mirror of [`World::cell_get`]: on success the target moves from the
    /// agent's inventory into this cell.
    pub fn cell_drop(&mut self, cell: CellId, actor: ThingId, target: ObjectId, reward: Reward) -> Result<Outcome, WorldError> {
        if self.is_solid(cell) {
            return Ok(Outcome::halt(reward));
        }
        let outcome = self.call_objects(cell, Some(target), reward, |world, object, reward| {
            world.object_drop(object, actor, target, reward)
        })?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        let outcome = self.object_drop(target, actor, target, outcome.reward)?;
        if outcome.is_halt() {
            return Ok(outcome);
        }
        self.state.transfer(ThingId::Object(target), Container::Cell(cell))?;
        Ok(outcome)
    }
}
