use thiserror::Error;

use crate::grid::CellId;
use crate::protocol::{Container, ObjectId, ThingId};

/// Broken invariants of the containment model.
///
/// These are never gameplay outcomes: a blocked move or a full inventory is
/// reported through [`crate::Disposition::Halt`] and a reward. A `WorldError`
/// means some behavior composition put the world into a state it must never
/// reach, so the current action is aborted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("cell {cell:?} already holds portable object {existing}, cannot add {incoming}")]
    PortableOccupied { cell: CellId, existing: ObjectId, incoming: ObjectId },
    #[error("cell {cell:?} already holds movable object {existing}, cannot add {incoming}")]
    MovableOccupied { cell: CellId, existing: ObjectId, incoming: ObjectId },
    #[error("cell {cell:?} already holds the agent")]
    AgentOccupied { cell: CellId },
    #[error("agent already holds {held}, cannot take {incoming}")]
    AgentFull { held: ObjectId, incoming: ObjectId },
    #[error("{thing:?} cannot be placed in {container:?}")]
    NotPlaceable { thing: ThingId, container: Container },
    #[error("{thing:?} names {container:?} as its container but is not in its inventory")]
    ContainerMismatch { thing: ThingId, container: Container },
    #[error("singleton cache of cell {cell:?} disagrees with its inventory")]
    CacheMismatch { cell: CellId },
    #[error("object {object} found {count} times in the world")]
    Conservation { object: ObjectId, count: usize },
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("grid is {width}x{height} but holds {cells} cells")]
    GridShape { width: usize, height: usize, cells: usize },
    #[error("cell {0:?} does not match its place in the grid")]
    MisplacedCell(CellId),
    #[error("no cell {0:?} in this grid")]
    UnknownCell(CellId),
    #[error("entry redirected more than {limit} times in one action")]
    RedirectLimit { limit: usize },
}
