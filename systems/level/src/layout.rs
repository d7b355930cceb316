//! Textual level layouts.

use std::str::FromStr;

use delve_core::{CellCoord, DoorState, EntityKind, LadderDirection, ObstacleKind, TileKind};
use thiserror::Error;

/// Errors raised while parsing a textual layout.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("layout contains no rows")]
    Empty,
    /// A row differs in width from the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character does not map to any tile or entity.
    #[error("unknown glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
    /// More than one `@` marker was present.
    #[error("second player marker at column {column}, row {row}")]
    MultiplePlayers {
        /// Zero-based column index.
        column: usize,
        /// Zero-based row index.
        row: usize,
    },
    /// The layout does not fit into 32-bit grid coordinates.
    #[error("layout of {columns}x{rows} cells is too large")]
    TooLarge {
        /// Width of the layout.
        columns: usize,
        /// Height of the layout.
        rows: usize,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct LayoutCell {
    tile: Option<TileKind>,
    entity: Option<EntityKind>,
}

impl LayoutCell {
    const fn new(tile: Option<TileKind>, entity: Option<EntityKind>) -> Self {
        Self { tile, entity }
    }
}

/// Parsed level: terrain, entities, and an optional player marker.
///
/// Text rows map to grid rows top to bottom, so the first line is row 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    columns: u32,
    rows: u32,
    cells: Vec<LayoutCell>,
    player: Option<CellCoord>,
}

impl LevelLayout {
    /// Parses a layout drawn with the glyph table below.
    ///
    /// | Glyph | Tile | Entity |
    /// | --- | --- | --- |
    /// | `#` | wall | wall obstacle |
    /// | `.` | floor | |
    /// | ` ` | none | |
    /// | `+` | doorway | closed door |
    /// | `'` | doorway | open door |
    /// | `r` | floor | rock |
    /// | `i` | floor | item |
    /// | `c` | floor | collectable |
    /// | `<` | floor | ladder up |
    /// | `>` | floor | ladder down |
    /// | `@` | floor | player |
    ///
    /// Trailing empty lines are ignored; rows of void glyphs are kept.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            let _ = lines.pop();
        }
        let Some(first) = lines.first() else {
            return Err(LayoutError::Empty);
        };

        let width = first.chars().count();
        let height = lines.len();
        if width == 0 {
            return Err(LayoutError::Empty);
        }
        let (Ok(columns), Ok(rows)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(LayoutError::TooLarge {
                columns: width,
                rows: height,
            });
        };

        let mut cells = Vec::with_capacity(width.saturating_mul(height));
        let mut player = None;
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }
            for (column, glyph) in line.chars().enumerate() {
                if glyph == '@' {
                    if player.is_some() {
                        return Err(LayoutError::MultiplePlayers { column, row });
                    }
                    player = Some(CellCoord::new(column as u32, row as u32));
                }
                let cell = decode(glyph).ok_or(LayoutError::UnknownGlyph { glyph, column, row })?;
                cells.push(cell);
            }
        }

        Ok(Self {
            columns,
            rows,
            cells,
            player,
        })
    }

    /// Provides the dimensions of the layout as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Cell marked with `@`, if any.
    #[must_use]
    pub const fn player(&self) -> Option<CellCoord> {
        self.player
    }

    /// Terrain drawn at the cell; `None` for void or out-of-bounds cells.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<TileKind> {
        self.cell(cell).and_then(|cell| cell.tile)
    }

    /// Non-player entity drawn at the cell.
    #[must_use]
    pub fn entity(&self, cell: CellCoord) -> Option<EntityKind> {
        self.cell(cell).and_then(|cell| cell.entity)
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| CellCoord::new(column, row))
        })
    }

    /// First cell holding a ladder leading `direction`, in row-major order.
    #[must_use]
    pub fn ladder(&self, direction: LadderDirection) -> Option<CellCoord> {
        self.cells()
            .find(|&cell| self.entity(cell) == Some(EntityKind::Ladder { direction }))
    }

    /// Reports whether the cell carries a tile and no drawn entity.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.cell(cell)
            .is_some_and(|cell| cell.tile.is_some() && cell.entity.is_none())
            && self.player != Some(cell)
    }

    fn cell(&self, cell: CellCoord) -> Option<&LayoutCell> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let index = cell.row() as usize * self.columns as usize + cell.column() as usize;
        self.cells.get(index)
    }
}

impl FromStr for LevelLayout {
    type Err = LayoutError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

fn decode(glyph: char) -> Option<LayoutCell> {
    let floor = Some(TileKind::Floor);
    let cell = match glyph {
        '#' => LayoutCell::new(
            Some(TileKind::Wall),
            Some(EntityKind::Obstacle(ObstacleKind::Wall)),
        ),
        '.' | '@' => LayoutCell::new(floor, None),
        ' ' => LayoutCell::default(),
        '+' => LayoutCell::new(
            Some(TileKind::Doorway),
            Some(EntityKind::Door {
                state: DoorState::Closed,
            }),
        ),
        '\'' => LayoutCell::new(
            Some(TileKind::Doorway),
            Some(EntityKind::Door {
                state: DoorState::Open,
            }),
        ),
        'r' => LayoutCell::new(floor, Some(EntityKind::Obstacle(ObstacleKind::Rock))),
        'i' => LayoutCell::new(floor, Some(EntityKind::Item { picked_up: false })),
        'c' => LayoutCell::new(floor, Some(EntityKind::Collectable { picked_up: false })),
        '<' => LayoutCell::new(
            floor,
            Some(EntityKind::Ladder {
                direction: LadderDirection::Up,
            }),
        ),
        '>' => LayoutCell::new(
            floor,
            Some(EntityKind::Ladder {
                direction: LadderDirection::Down,
            }),
        ),
        _ => return None,
    };
    Some(cell)
}
