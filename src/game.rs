use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::grid::{Cell, Direction, Grid, Position};

/// Number of `Goal` cells not covered by a block.
pub fn count_goal_cells(grid: &Grid) -> usize {
    grid.positions_of(Cell::Goal).count()
}

/// Blocks with at least one orthogonal `Goal` neighbour, in row-major order.
fn goal_adjacent_blocks(grid: &Grid) -> impl Iterator<Item = Position> + '_ {
    grid.positions_of(Cell::Block).filter(|&pos| {
        grid.neighbors(pos)
            .iter()
            .any(|&neighbor| grid[neighbor] == Cell::Goal)
    })
}

/// Count blocks that sit next to a goal.
///
/// This is the level-start heuristic: a block counts once if any of its four
/// neighbours is a `Goal`, regardless of how many. It is not the rule used
/// while pushing, which credits a block only when it lands on a goal.
pub fn compute_goals_completed(grid: &Grid) -> usize {
    goal_adjacent_blocks(grid).count()
}

pub fn is_at_exit(state: &GameState) -> bool {
    state.cell_at(state.player) == Cell::Exit
}

/// Result of a move attempt. Rejections carry no payload: the caller keeps
/// its current state.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Walked(GameState),
    Pushed(GameState),
    Rejected,
}

impl Transition {
    pub fn into_state(self) -> Option<GameState> {
        match self {
            Transition::Walked(state) | Transition::Pushed(state) => Some(state),
            Transition::Rejected => None,
        }
    }
}

/// Immutable snapshot of a level in play.
///
/// Walls, floor, goals and exits live in a shared tile layer that only
/// changes when closed exits open; blocks are tracked separately so that a
/// cell vacated by a block shows its original tile again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    tiles: Arc<Grid>,
    blocks: BTreeSet<Position>,
    // Blocks standing on a goal tile.
    covered: BTreeSet<Position>,
    // Level-start credit for blocks next to a goal. It follows its block
    // until the block is neither on nor beside a goal.
    seeded: BTreeSet<Position>,
    player: Position,
    moves: u32,
    is_completed: bool,
    total_goals: usize,
}

impl GameState {
    /// Build a state from a composed grid without crediting any block.
    /// `PlayerStart` cells are treated as floor.
    ///
    /// `player` must be inside the grid on a cell the player may stand on.
    pub fn new(grid: Grid, player: Position) -> Self {
        debug_assert!(
            grid.get(player)
                .is_some_and(|cell| cell.is_walkable() || cell == Cell::PlayerStart),
            "player {} is not on a walkable cell",
            player
        );
        let total_goals = count_goal_cells(&grid);
        let mut tiles = grid;
        let mut blocks = BTreeSet::new();
        for pos in tiles.positions_of(Cell::Block).collect::<Vec<_>>() {
            tiles[pos] = Cell::Floor;
            blocks.insert(pos);
        }
        for pos in tiles.positions_of(Cell::PlayerStart).collect::<Vec<_>>() {
            tiles[pos] = Cell::Floor;
        }

        GameState {
            tiles: Arc::new(tiles),
            blocks,
            covered: BTreeSet::new(),
            seeded: BTreeSet::new(),
            player,
            moves: 0,
            is_completed: false,
            total_goals,
        }
    }

    /// Build a level-start state: blocks next to a goal are credited up front
    /// (see [`compute_goals_completed`]), never more than there are goals.
    pub fn start(grid: Grid, player: Position) -> Self {
        let seeded: BTreeSet<Position> = goal_adjacent_blocks(&grid)
            .take(count_goal_cells(&grid))
            .collect();
        GameState {
            seeded,
            ..Self::new(grid, player)
        }
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn goals_completed(&self) -> usize {
        self.covered.len() + self.seeded.len()
    }

    pub fn total_goals(&self) -> usize {
        self.total_goals
    }

    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    /// Cell at `pos` with blocks drawn over the tile layer.
    /// Panics if `pos` is out of bounds.
    pub fn cell_at(&self, pos: Position) -> Cell {
        if self.blocks.contains(&pos) {
            Cell::Block
        } else {
            self.tiles[pos]
        }
    }

    /// The full composed grid.
    pub fn grid(&self) -> Grid {
        let mut grid = Grid::clone(&self.tiles);
        for &pos in &self.blocks {
            grid[pos] = Cell::Block;
        }
        grid
    }

    pub fn has_closed_exits(&self) -> bool {
        self.tiles.positions_of(Cell::ClosedExit).next().is_some()
    }

    pub fn is_at_exit(&self) -> bool {
        is_at_exit(self)
    }

    /// Mark the level as won. The caller decides when, after checking
    /// [`is_at_exit`].
    pub fn complete(self) -> Self {
        GameState {
            is_completed: true,
            ..self
        }
    }

    pub fn attempt_move(&self, direction: Direction) -> Transition {
        let Some(target) = self.tiles.step(self.player, direction) else {
            return Transition::Rejected;
        };

        match self.cell_at(target) {
            Cell::Wall | Cell::ClosedExit => Transition::Rejected,
            Cell::Block => self.push(target, direction),
            // The tile layer never holds a start marker, so only the
            // walkable cells reach this arm.
            Cell::Floor | Cell::Goal | Cell::Exit | Cell::PlayerStart => {
                Transition::Walked(GameState {
                    player: target,
                    moves: self.moves + 1,
                    ..self.clone()
                })
            }
        }
    }

    fn push(&self, block: Position, direction: Direction) -> Transition {
        let Some(beyond) = self.tiles.step(block, direction) else {
            return Transition::Rejected;
        };
        // Covers walls, closed exits and a second block: no chain pushing.
        if !self.cell_at(beyond).is_walkable() {
            return Transition::Rejected;
        }

        let mut next = self.clone();
        next.blocks.remove(&block);
        next.blocks.insert(beyond);

        next.covered.remove(&block);
        if next.tiles[beyond] == Cell::Goal {
            next.covered.insert(beyond);
        }
        if next.seeded.remove(&block) && next.touches_goal(beyond) {
            next.seeded.insert(beyond);
        }

        let bare_goals = next
            .tiles
            .positions_of(Cell::Goal)
            .filter(|pos| !next.blocks.contains(pos))
            .count();
        next.total_goals = bare_goals + next.goals_completed();

        next.player = block;
        next.moves += 1;

        if next.goals_completed() == next.total_goals {
            next.open_exits();
        }

        Transition::Pushed(next)
    }

    /// Whether a block at `pos` is on a goal tile or next to an uncovered goal.
    fn touches_goal(&self, pos: Position) -> bool {
        self.tiles[pos] == Cell::Goal
            || self
                .tiles
                .neighbors(pos)
                .iter()
                .any(|&neighbor| self.cell_at(neighbor) == Cell::Goal)
    }

    fn open_exits(&mut self) {
        let closed: Vec<Position> = self.tiles.positions_of(Cell::ClosedExit).collect();
        if closed.is_empty() {
            return;
        }

        let tiles = Arc::make_mut(&mut self.tiles);
        for pos in closed {
            tiles[pos] = Cell::Exit;
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() {
            let line: String = (0..self.width())
                .map(|x| {
                    let pos = Position::new(x, y);
                    if pos == self.player {
                        Cell::PlayerStart.symbol()
                    } else {
                        self.cell_at(pos).symbol()
                    }
                })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
