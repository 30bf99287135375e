use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellKind};
use crate::direction::Direction;
use crate::error::WorldError;

/// Handle to a cell owned by a [`Grid`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellId {
    /// Row-major index into the grid.
    At(usize),
    /// Shared wall surrounding the grid.
    Boundary,
    /// Holding area for things removed from play.
    Limbo,
}

/// Rectangular array of cells plus the shared boundary and limbo cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    boundary: Cell,
    limbo: Cell,
}

impl Grid {
    /// All cells open.
    pub fn new(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(Cell::new(CellKind::Open, Some((x as i32, y as i32))));
            }
        }
        Self {
            width,
            height,
            cells,
            boundary: Cell::new(CellKind::Boundary, None),
            limbo: Cell::new(CellKind::Limbo, None),
        }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize { y * self.width + x }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Cell at (x, y), or the boundary cell when out of bounds.
    pub fn at(&self, x: i32, y: i32) -> CellId {
        if self.in_bounds(x, y) {
            CellId::At(self.idx(x as usize, y as usize))
        } else {
            CellId::Boundary
        }
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        match id {
            CellId::At(i) => &self.cells[i],
            CellId::Boundary => &self.boundary,
            CellId::Limbo => &self.limbo,
        }
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        match id {
            CellId::At(i) => &mut self.cells[i],
            CellId::Boundary => &mut self.boundary,
            CellId::Limbo => &mut self.limbo,
        }
    }

    /// Neighbor of `id` in `direction`. Boundary and limbo have no neighbors
    /// but the boundary itself.
    pub fn next_cell(&self, id: CellId, direction: Direction) -> CellId {
        match self.cell(id).position() {
            Some((x, y)) => direction.next_cell(self, x, y),
            None => CellId::Boundary,
        }
    }

    pub(crate) fn set_kind(&mut self, x: i32, y: i32, kind: CellKind) {
        if let CellId::At(i) = self.at(x, y) {
            self.cells[i].set_kind(kind);
        }
    }

    /// Whether `id` names a cell of this grid.
    pub fn contains(&self, id: CellId) -> bool {
        match id {
            CellId::At(i) => i < self.cells.len(),
            CellId::Boundary | CellId::Limbo => true,
        }
    }

    /// Shape check for grids that were not built by [`Grid::new`], such as
    /// deserialized ones: cell count, coordinates and special cell kinds.
    pub(crate) fn check_shape(&self) -> Result<(), WorldError> {
        if self.width.checked_mul(self.height) != Some(self.cells.len()) {
            return Err(WorldError::GridShape { width: self.width, height: self.height, cells: self.cells.len() });
        }
        for (i, cell) in self.cells.iter().enumerate() {
            let expected = ((i % self.width) as i32, (i / self.width) as i32);
            let special = matches!(cell.kind(), CellKind::Boundary | CellKind::Limbo);
            if special || cell.position() != Some(expected) {
                return Err(WorldError::MisplacedCell(CellId::At(i)));
            }
        }
        if self.boundary.kind() != CellKind::Boundary || self.boundary.position().is_some() {
            return Err(WorldError::MisplacedCell(CellId::Boundary));
        }
        if self.limbo.kind() != CellKind::Limbo || self.limbo.position().is_some() {
            return Err(WorldError::MisplacedCell(CellId::Limbo));
        }
        Ok(())
    }

    /// In-grid cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().enumerate().map(|(i, c)| (CellId::At(i), c))
    }

    /// Every cell including boundary and limbo.
    pub(crate) fn all_cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells()
            .chain(std::iter::once((CellId::Boundary, &self.boundary)))
            .chain(std::iter::once((CellId::Limbo, &self.limbo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_resolves_to_boundary() {
        let g = Grid::new(3, 2);
        assert_eq!(g.at(-1, 0), CellId::Boundary);
        assert_eq!(g.at(3, 0), CellId::Boundary);
        assert_eq!(g.at(0, 2), CellId::Boundary);
        assert_eq!(g.at(2, 1), CellId::At(5));
        assert_eq!(g.cell(CellId::Boundary).kind(), CellKind::Boundary);
    }

    #[test]
    fn every_cell_knows_its_coordinates() {
        let g = Grid::new(4, 3);
        for (id, cell) in g.cells() {
            let (x, y) = cell.position().unwrap();
            assert_eq!(g.at(x, y), id);
        }
        assert_eq!(g.cell(CellId::Limbo).position(), None);
    }

    #[test]
    fn shape_check_catches_resized_grids() {
        let g = Grid::new(3, 3);
        assert_eq!(g.check_shape(), Ok(()));
        assert!(g.contains(CellId::At(8)) && !g.contains(CellId::At(9)));

        let mut json = serde_json::to_value(&g).unwrap();
        json["width"] = 100.into();
        json["height"] = 100.into();
        let resized: Grid = serde_json::from_value(json).unwrap();
        assert_eq!(resized.check_shape(), Err(WorldError::GridShape { width: 100, height: 100, cells: 9 }));

        let mut json = serde_json::to_value(&g).unwrap();
        json["width"] = 1.into();
        json["height"] = 9.into();
        let reshaped: Grid = serde_json::from_value(json).unwrap();
        assert_eq!(reshaped.check_shape(), Err(WorldError::MisplacedCell(CellId::At(1))));
    }

    #[test]
    fn neighbors_of_special_cells_are_boundary() {
        let g = Grid::new(2, 2);
        assert_eq!(g.next_cell(CellId::Limbo, Direction::North), CellId::Boundary);
        assert_eq!(g.next_cell(CellId::Boundary, Direction::East), CellId::Boundary);
        assert_eq!(g.next_cell(g.at(0, 0), Direction::North), g.at(0, 1));
    }
}
