use arrayvec::ArrayVec;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::MalformedLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Wall,
    Floor,
    Block,
    PlayerStart,
    Exit,
    Goal,
    ClosedExit,
}

impl Cell {
    /// Parse a cell from the level alphabet.
    ///
    /// Characters:
    /// - `#` = Wall
    /// - `.` = Floor
    /// - `B` = Block
    /// - `P` = Player start
    /// - `E` = Exit
    /// - `G` = Goal
    /// - `C` = Closed exit
    pub fn from_symbol(ch: char) -> Option<Cell> {
        match ch {
            '#' => Some(Cell::Wall),
            '.' => Some(Cell::Floor),
            'B' => Some(Cell::Block),
            'P' => Some(Cell::PlayerStart),
            'E' => Some(Cell::Exit),
            'G' => Some(Cell::Goal),
            'C' => Some(Cell::ClosedExit),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Floor => '.',
            Cell::Block => 'B',
            Cell::PlayerStart => 'P',
            Cell::Exit => 'E',
            Cell::Goal => 'G',
            Cell::ClosedExit => 'C',
        }
    }

    /// Cells a player may step onto and a block may be pushed onto.
    pub fn is_walkable(self) -> bool {
        matches!(self, Cell::Floor | Cell::Goal | Cell::Exit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Parse a move symbol (`u`, `d`, `l`, `r`, either case).
    pub fn from_symbol(ch: char) -> Option<Direction> {
        match ch.to_ascii_lowercase() {
            'u' => Some(Direction::Up),
            'd' => Some(Direction::Down),
            'l' => Some(Direction::Left),
            'r' => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "Up"),
            Direction::Down => write!(f, "Down"),
            Direction::Left => write!(f, "Left"),
            Direction::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rectangular, row-major grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
    width: usize,
    height: usize,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, MalformedLevel> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(MalformedLevel::Empty);
        }

        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);
        for (row, cells_in_row) in rows.into_iter().enumerate() {
            if cells_in_row.len() != width {
                return Err(MalformedLevel::Ragged {
                    row,
                    expected: width,
                    found: cells_in_row.len(),
                });
            }
            cells.extend(cells_in_row);
        }

        Ok(Grid {
            cells,
            width,
            height,
        })
    }

    /// Parse a grid written in the level alphabet, one row per line.
    /// Trailing whitespace on a line is ignored.
    pub fn from_text(text: &str) -> Result<Self, MalformedLevel> {
        let mut rows = Vec::new();
        for (y, line) in text.lines().enumerate() {
            let row = line
                .trim_end()
                .chars()
                .enumerate()
                .map(|(x, ch)| {
                    Cell::from_symbol(ch).ok_or(MalformedLevel::InvalidCharacter { ch, x, y })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.contains(pos).then(|| self.cells[pos.y * self.width + pos.x])
    }

    /// Move from `pos` in the given direction.
    /// Returns the new position if it is within bounds, None otherwise.
    pub fn step(&self, pos: Position, dir: Direction) -> Option<Position> {
        let (dx, dy) = dir.delta();
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let next = Position::new(x, y);
        self.contains(next).then_some(next)
    }

    /// Orthogonal neighbours of `pos` that lie inside the grid.
    pub fn neighbors(&self, pos: Position) -> ArrayVec<Position, 4> {
        ALL_DIRECTIONS
            .iter()
            .filter_map(|&dir| self.step(pos, dir))
            .collect()
    }

    /// All cells with their positions, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (Position::new(i % width, i / width), cell))
    }

    pub fn positions_of(&self, cell: Cell) -> impl Iterator<Item = Position> + '_ {
        self.iter()
            .filter(move |&(_, c)| c == cell)
            .map(|(pos, _)| pos)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width)
    }
}

impl Index<Position> for Grid {
    type Output = Cell;

    fn index(&self, pos: Position) -> &Self::Output {
        assert!(self.contains(pos), "position {} out of bounds", pos);
        &self.cells[pos.y * self.width + pos.x]
    }
}

impl IndexMut<Position> for Grid {
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        assert!(self.contains(pos), "position {} out of bounds", pos);
        &mut self.cells[pos.y * self.width + pos.x]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|cell| cell.symbol()).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
