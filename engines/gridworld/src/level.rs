//! Building worlds: programmatic placement and ASCII layouts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::CellKind;
use crate::error::WorldError;
use crate::grid::{CellId, Grid};
use crate::object::{Object, ObjectKind};
use crate::protocol::{Container, ThingId};
use crate::world::WorldState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("level has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("unknown glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: i32, y: i32 },
    #[error("level places no agent")]
    NoAgent,
    #[error("level places more than one agent")]
    MultipleAgents,
    #[error("({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: i32, y: i32, width: usize, height: usize },
    #[error("the agent cannot start inside a wall at ({x}, {y})")]
    Solid { x: i32, y: i32 },
    #[error(transparent)]
    Placement(#[from] WorldError),
}

/// Places walls, the agent and objects, then validates the lot in `build`.
/// Objects are inserted in call order, which fixes their dispatch order.
#[derive(Clone, Debug)]
pub struct WorldBuilder {
    width: usize,
    height: usize,
    walls: Vec<(i32, i32)>,
    agent: Option<(i32, i32)>,
    objects: Vec<(Option<(i32, i32)>, Object)>,
}

impl WorldBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, walls: Vec::new(), agent: None, objects: Vec::new() }
    }

    pub fn wall(mut self, x: i32, y: i32) -> Self {
        self.walls.push((x, y));
        self
    }

    /// Starting cell of the agent; a later call replaces an earlier one.
    pub fn agent(mut self, x: i32, y: i32) -> Self {
        self.agent = Some((x, y));
        self
    }

    pub fn object(mut self, x: i32, y: i32, object: Object) -> Self {
        self.objects.push((Some((x, y)), object));
        self
    }

    /// An object that starts out of play, in limbo.
    pub fn stashed(mut self, object: Object) -> Self {
        self.objects.push((None, object));
        self
    }

    pub fn build(self) -> Result<WorldState, LevelError> {
        let WorldBuilder { width, height, walls, agent, objects } = self;
        if width == 0 || height == 0 {
            return Err(LevelError::Empty);
        }
        let check_bounds = |x: i32, y: i32| {
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                Ok(())
            } else {
                Err(LevelError::OutOfBounds { x, y, width, height })
            }
        };

        let mut grid = Grid::new(width, height);
        for (x, y) in walls {
            check_bounds(x, y)?;
            grid.set_kind(x, y, CellKind::Wall);
        }

        let (ax, ay) = agent.ok_or(LevelError::NoAgent)?;
        check_bounds(ax, ay)?;
        let start = grid.at(ax, ay);
        if grid.cell(start).kind().is_solid() {
            return Err(LevelError::Solid { x: ax, y: ay });
        }

        let mut state = WorldState::new(grid, start);
        state.attach(ThingId::Agent, Container::Cell(start))?;
        for (at, object) in objects {
            let cell = match at {
                Some((x, y)) => {
                    check_bounds(x, y)?;
                    state.grid.at(x, y)
                }
                None => CellId::Limbo,
            };
            state.add_object(object, Container::Cell(cell))?;
        }
        state.check_invariants()?;
        Ok(state)
    }
}

/// ASCII layout, one string per row, the first row being the northern
/// edge. Legend: `#` wall, `.` open, `@` agent, `B` crate, `k` key,
/// `G` goal, `^` trap, `L` lantern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub rows: Vec<String>,
}

impl Level {
    /// Blank lines and surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Result<Level, LevelError> {
        let rows: Vec<String> = text.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();
        let level = Level { rows };
        level.dimensions()?;
        Ok(level)
    }

    /// (width, height) after checking the rows form a rectangle.
    pub fn dimensions(&self) -> Result<(usize, usize), LevelError> {
        let first = self.rows.first().ok_or(LevelError::Empty)?;
        let expected = first.chars().count();
        if expected == 0 {
            return Err(LevelError::Empty);
        }
        for (row, line) in self.rows.iter().enumerate() {
            let found = line.chars().count();
            if found != expected {
                return Err(LevelError::Ragged { row, expected, found });
            }
        }
        Ok((expected, self.rows.len()))
    }

    pub fn to_world(&self) -> Result<WorldState, LevelError> {
        let (width, height) = self.dimensions()?;
        let mut builder = WorldBuilder::new(width, height);
        let mut agent_seen = false;
        let mut names: HashMap<&'static str, usize> = HashMap::new();
        let mut name = |base: &'static str| {
            let n = names.entry(base).or_insert(0);
            *n += 1;
            if *n == 1 { base.to_string() } else { format!("{base}-{n}") }
        };

        for (row, line) in self.rows.iter().enumerate() {
            let y = (height - 1 - row) as i32;
            for (col, glyph) in line.chars().enumerate() {
                let x = col as i32;
                builder = match glyph {
                    '.' => builder,
                    '#' => builder.wall(x, y),
                    '@' => {
                        if agent_seen {
                            return Err(LevelError::MultipleAgents);
                        }
                        agent_seen = true;
                        builder.agent(x, y)
                    }
                    'B' => builder.object(x, y, Object::crate_box(name("box"))),
                    'k' => builder.object(x, y, Object::item(name("key")).with_glyph('k')),
                    'G' => builder.object(x, y, Object::new(name("goal"), ObjectKind::Goal)),
                    '^' => builder.object(x, y, Object::new(name("trap"), ObjectKind::Trap)),
                    'L' => builder.object(x, y, Object::lantern(name("lantern"))),
                    other => return Err(LevelError::UnknownGlyph { glyph: other, x, y }),
                };
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_is_north() {
        let level = Level::parse("
            #.k
            @.B
        ")
        .unwrap();
        assert_eq!(level.dimensions().unwrap(), (3, 2));
        let state = level.to_world().unwrap();
        assert_eq!(state.position_of(ThingId::Agent).unwrap(), Some((0, 0)));
        assert_eq!(state.grid().cell(state.grid().at(0, 1)).kind(), CellKind::Wall);
        let key = state.object_by_name("key").unwrap();
        assert_eq!(state.position_of(ThingId::Object(key)).unwrap(), Some((2, 1)));
        let boxed = state.object_by_name("box").unwrap();
        assert_eq!(state.position_of(ThingId::Object(boxed)).unwrap(), Some((2, 0)));
    }

    #[test]
    fn repeated_glyphs_get_distinct_names() {
        let state = Level::parse("@BB").unwrap().to_world().unwrap();
        assert!(state.object_by_name("box").is_some());
        assert!(state.object_by_name("box-2").is_some());
    }

    #[test]
    fn malformed_layouts() {
        assert_eq!(Level::parse("").unwrap_err(), LevelError::Empty);
        assert_eq!(Level::parse("@..\n..").unwrap_err(), LevelError::Ragged { row: 1, expected: 3, found: 2 });
        assert_eq!(Level::parse("...").unwrap().to_world().unwrap_err(), LevelError::NoAgent);
        assert_eq!(Level::parse("@@").unwrap().to_world().unwrap_err(), LevelError::MultipleAgents);
        assert!(matches!(Level::parse("@x").unwrap().to_world(), Err(LevelError::UnknownGlyph { glyph: 'x', .. })));
    }

    #[test]
    fn builder_rejects_bad_placements() {
        let err = WorldBuilder::new(2, 2).agent(5, 0).build().unwrap_err();
        assert!(matches!(err, LevelError::OutOfBounds { x: 5, .. }));
        let err = WorldBuilder::new(2, 2).wall(0, 0).agent(0, 0).build().unwrap_err();
        assert_eq!(err, LevelError::Solid { x: 0, y: 0 });
        let err = WorldBuilder::new(2, 2).wall(0, -1).agent(0, 0).build().unwrap_err();
        assert!(matches!(err, LevelError::OutOfBounds { x: 0, y: -1, .. }));
        let err = WorldBuilder::new(2, 2).agent(0, 0).object(9, 9, Object::item("x")).build().unwrap_err();
        assert_eq!(err, LevelError::OutOfBounds { x: 9, y: 9, width: 2, height: 2 });
        let err = WorldBuilder::new(2, 2)
            .agent(0, 0)
            .object(1, 1, Object::item("a"))
            .object(1, 1, Object::item("b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, LevelError::Placement(WorldError::PortableOccupied { .. })));
    }

    #[test]
    fn stashed_objects_start_in_limbo() {
        let state = WorldBuilder::new(1, 1).agent(0, 0).stashed(Object::item("spare")).build().unwrap();
        let spare = state.object_by_name("spare").unwrap();
        assert_eq!(state.position_of(ThingId::Object(spare)).unwrap(), None);
        assert!(state.grid().cell(CellId::Limbo).inventory().is_empty());
    }
}
