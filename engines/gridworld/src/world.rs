//! World state, containment bookkeeping and snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::error::WorldError;
use crate::grid::{CellId, Grid};
use crate::object::{Object, ObjectKind};
use crate::protocol::{Container, ObjectId, ThingId};
use crate::reward::RewardMap;

/// Everything that changes during an episode. Cloning it is a full,
/// independent copy: things refer to each other by id, never by pointer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldState {
    pub(crate) grid: Grid,
    pub(crate) objects: Vec<Object>,
    pub(crate) agent: Agent,
    pub(crate) terminal: bool,
}

impl WorldState {
    pub(crate) fn new(grid: Grid, agent_cell: CellId) -> Self {
        Self { grid, objects: Vec::new(), agent: Agent::new(agent_cell), terminal: false }
    }

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn agent(&self) -> &Agent { &self.agent }
    pub fn objects(&self) -> &[Object] { &self.objects }

    pub fn object(&self, id: ObjectId) -> Result<&Object, WorldError> {
        self.objects.get(id.0).ok_or(WorldError::UnknownObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object, WorldError> {
        self.objects.get_mut(id.0).ok_or(WorldError::UnknownObject(id))
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name() == name).map(ObjectId)
    }

    /// Objects a renderer or observer may see.
    pub fn visible_objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().enumerate().filter(|(_, o)| o.is_visible()).map(|(i, o)| (ObjectId(i), o))
    }

    /// Explicitly finished, or the agent stands on a goal.
    pub fn is_terminal(&self) -> bool {
        self.terminal
            || self
                .grid
                .cell(self.agent.cell())
                .objects()
                .any(|o| self.object(o).map_or(false, |obj| matches!(obj.kind(), ObjectKind::Goal)))
    }

    pub fn set_terminal(&mut self, terminal: bool) {
        self.terminal = terminal;
    }

    pub fn container_of(&self, thing: ThingId) -> Result<Container, WorldError> {
        Ok(match thing {
            ThingId::Agent => Container::Cell(self.agent.cell()),
            ThingId::Object(id) => self.object(id)?.container(),
        })
    }

    /// Cell a thing is in, following the agent for carried objects.
    pub fn cell_of(&self, thing: ThingId) -> Result<CellId, WorldError> {
        Ok(match self.container_of(thing)? {
            Container::Cell(cell) => cell,
            Container::Agent => self.agent.cell(),
        })
    }

    /// Grid coordinates of a thing; `None` in limbo.
    pub fn position_of(&self, thing: ThingId) -> Result<Option<(i32, i32)>, WorldError> {
        Ok(self.grid.cell(self.cell_of(thing)?).position())
    }

    /// Take `thing` out of its current container. Leaves its back-reference
    /// stale until [`WorldState::attach`] runs.
    fn detach(&mut self, thing: ThingId) -> Result<(), WorldError> {
        let container = self.container_of(thing)?;
        let present = match container {
            Container::Cell(cell) => self.grid.cell_mut(cell).remove(thing),
            Container::Agent => match thing.object() {
                Some(id) if self.agent.holding() == Some(id) => {
                    self.agent.holding = None;
                    true
                }
                _ => false,
            },
        };
        if present {
            Ok(())
        } else {
            Err(WorldError::ContainerMismatch { thing, container })
        }
    }

    /// Add `thing` to `container` and point its back-reference there.
    pub(crate) fn attach(&mut self, thing: ThingId, container: Container) -> Result<(), WorldError> {
        match (thing, container) {
            (ThingId::Agent, Container::Cell(cell)) => {
                self.grid.cell_mut(cell).insert_agent(cell)?;
                self.agent.cell = cell;
            }
            (ThingId::Agent, Container::Agent) => {
                return Err(WorldError::NotPlaceable { thing, container });
            }
            (ThingId::Object(id), Container::Cell(cell)) => {
                let obj = self.object(id)?;
                let (portable, movable) = (obj.is_portable(), obj.is_movable());
                self.grid.cell_mut(cell).insert_object(cell, id, portable, movable)?;
                self.object_mut(id)?.set_container(container);
            }
            (ThingId::Object(id), Container::Agent) => {
                if let Some(held) = self.agent.holding() {
                    return Err(WorldError::AgentFull { held, incoming: id });
                }
                self.agent.holding = Some(id);
                self.object_mut(id)?.set_container(container);
            }
        }
        Ok(())
    }

    /// Move `thing` from wherever it is into `container`. A refused
    /// placement puts the thing back where it was before reporting.
    pub(crate) fn transfer(&mut self, thing: ThingId, container: Container) -> Result<(), WorldError> {
        let previous = self.container_of(thing)?;
        self.detach(thing)?;
        if let Err(err) = self.attach(thing, container) {
            self.attach(thing, previous)?;
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn add_object(&mut self, object: Object, container: Container) -> Result<ObjectId, WorldError> {
        let id = ObjectId(self.objects.len());
        self.objects.push(object);
        self.attach(ThingId::Object(id), container)?;
        Ok(id)
    }

    /// Take an object out of play.
    pub fn send_to_limbo(&mut self, object: ObjectId) -> Result<(), WorldError> {
        self.transfer(ThingId::Object(object), Container::Cell(CellId::Limbo))
    }

    /// Bring an object back from limbo onto the grid at (x, y).
    pub fn recall_from_limbo(&mut self, object: ObjectId, x: i32, y: i32) -> Result<(), WorldError> {
        let thing = ThingId::Object(object);
        let container = self.container_of(thing)?;
        if container != Container::Cell(CellId::Limbo) {
            return Err(WorldError::ContainerMismatch { thing, container: Container::Cell(CellId::Limbo) });
        }
        let cell = self.grid.at(x, y);
        self.transfer(thing, Container::Cell(cell))
    }

    /// Containment consistency, singleton limits and conservation.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        self.grid.check_shape()?;
        let referenced = self.objects.iter().filter_map(|o| match o.container() {
            Container::Cell(cell) => Some(cell),
            Container::Agent => None,
        });
        for cell in std::iter::once(self.agent.cell()).chain(referenced) {
            if !self.grid.contains(cell) {
                return Err(WorldError::UnknownCell(cell));
            }
        }

        let mut seen: HashMap<ObjectId, usize> = HashMap::new();
        for (id, cell) in self.grid.all_cells() {
            let mut portable = None;
            let mut movable = None;
            let mut agents = 0;
            for &thing in cell.contents() {
                if self.container_of(thing)? != Container::Cell(id) {
                    return Err(WorldError::ContainerMismatch { thing, container: Container::Cell(id) });
                }
                match thing {
                    ThingId::Agent => agents += 1,
                    ThingId::Object(o) => {
                        *seen.entry(o).or_default() += 1;
                        let obj = self.object(o)?;
                        if obj.is_portable() {
                            if let Some(existing) = portable.replace(o) {
                                return Err(WorldError::PortableOccupied { cell: id, existing, incoming: o });
                            }
                        }
                        if obj.is_movable() {
                            if let Some(existing) = movable.replace(o) {
                                return Err(WorldError::MovableOccupied { cell: id, existing, incoming: o });
                            }
                        }
                    }
                }
            }
            if id == CellId::Limbo {
                continue;
            }
            if agents > 1 {
                return Err(WorldError::AgentOccupied { cell: id });
            }
            if cell.portable_object() != portable || cell.movable_object() != movable || cell.has_agent() != (agents == 1) {
                return Err(WorldError::CacheMismatch { cell: id });
            }
        }

        let agent_container = Container::Cell(self.agent.cell());
        if !self.grid.cell(self.agent.cell()).contains(ThingId::Agent) {
            return Err(WorldError::ContainerMismatch { thing: ThingId::Agent, container: agent_container });
        }
        if let Some(held) = self.agent.holding() {
            *seen.entry(held).or_default() += 1;
            if self.object(held)?.container() != Container::Agent {
                return Err(WorldError::ContainerMismatch { thing: ThingId::Object(held), container: Container::Agent });
            }
        }

        for (i, obj) in self.objects.iter().enumerate() {
            let id = ObjectId(i);
            let count = seen.get(&id).copied().unwrap_or(0);
            if count != 1 {
                return Err(WorldError::Conservation { object: id, count });
            }
            if let Container::Cell(cell) = obj.container() {
                if !self.grid.cell(cell).contains(ThingId::Object(id)) {
                    return Err(WorldError::ContainerMismatch { thing: ThingId::Object(id), container: obj.container() });
                }
            }
        }
        Ok(())
    }
}

/// Saved copy of a [`WorldState`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot(WorldState);

impl Snapshot {
    pub fn state(&self) -> &WorldState { &self.0 }
}

impl From<WorldState> for Snapshot {
    fn from(state: WorldState) -> Self {
        Snapshot(state)
    }
}

/// A world state plus the reward table its behaviors consult.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    pub(crate) state: WorldState,
    pub(crate) rewards: RewardMap,
    /// Crate currently being pushed by the agent.
    #[serde(skip)]
    pub(crate) pushing: Option<ObjectId>,
    /// Portal hops taken by the entry in flight.
    #[serde(skip)]
    pub(crate) redirects: usize,
}

impl World {
    pub fn new(state: WorldState, rewards: RewardMap) -> Self {
        Self { state, rewards, pushing: None, redirects: 0 }
    }

    pub fn state(&self) -> &WorldState { &self.state }

    /// Administrative access (limbo, terminal flag). Containment changes made
    /// here bypass the behavior protocol.
    pub fn state_mut(&mut self) -> &mut WorldState { &mut self.state }

    pub fn rewards(&self) -> &RewardMap { &self.rewards }

    pub fn save_state(&self) -> Snapshot {
        Snapshot(self.state.clone())
    }

    pub fn restore_state(&mut self, snapshot: Snapshot) {
        self.state = snapshot.0;
    }
}
