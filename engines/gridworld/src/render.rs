//! Plain-text rendering of a world, north row first.

use crate::grid::CellId;
use crate::protocol::{ObjectId, ThingId};
use crate::world::WorldState;

/// Glyph shown for one cell: the agent, then its movable object, then its
/// portable object, then any other visible object, then the cell itself.
pub fn cell_glyph(state: &WorldState, cell: CellId) -> char {
    let c = state.grid().cell(cell);
    if c.has_agent() {
        return '@';
    }
    let visible = |id: ObjectId| state.object(id).ok().filter(|o| o.is_visible()).map(|o| o.glyph());
    c.movable_object()
        .and_then(visible)
        .or_else(|| c.portable_object().and_then(visible))
        .or_else(|| c.inventory().iter().filter_map(|t| match t {
            ThingId::Object(id) => visible(*id),
            ThingId::Agent => None,
        }).next())
        .unwrap_or_else(|| c.glyph())
}

pub fn render_text(state: &WorldState) -> String {
    let grid = state.grid();
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for y in (0..grid.height() as i32).rev() {
        for x in 0..grid.width() as i32 {
            out.push(cell_glyph(state, grid.at(x, y)));
        }
        if y > 0 {
            out.push('\n');
        }
    }
    out
}
