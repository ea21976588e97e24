use std::sync::Arc;

use crate::error::LevelError;
use crate::game::{GameState, Transition};
use crate::grid::Direction;
use crate::levels::{Level, Levels};

/// What a move request did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEvent {
    /// The level is already finished; nothing changed.
    Ignored,
    /// The engine refused the move; nothing changed.
    Rejected,
    Moved,
    GoalPlaced { completed: usize, total: usize },
    GoalLost { completed: usize, total: usize },
    Escaped { moves: u32 },
}

impl MoveEvent {
    pub const fn has_update(self) -> bool {
        !matches!(self, MoveEvent::Ignored | MoveEvent::Rejected)
    }
}

/// One player's play-through of a level catalogue.
#[derive(Debug, Clone)]
pub struct Session {
    levels: Arc<Levels>,
    level_index: usize,
    state: GameState,
    history: Vec<GameState>,
}

impl Session {
    pub fn new(levels: Arc<Levels>, level_index: usize) -> Result<Self, LevelError> {
        let state = levels.start_level(level_index)?;
        Ok(Session {
            levels,
            level_index,
            state,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level(&self) -> &Level {
        // The index is validated whenever it changes.
        &self.levels[self.level_index]
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn try_move(&mut self, direction: Direction) -> MoveEvent {
        if self.state.is_completed() {
            log::trace!("level already complete, ignoring {}", direction);
            return MoveEvent::Ignored;
        }

        let transition = self.state.attempt_move(direction);
        if let Transition::Pushed(_) = &transition {
            log::trace!("push {} from {}", direction, self.state.player());
        }
        let Some(next) = transition.into_state() else {
            log::trace!("move {} from {} rejected", direction, self.state.player());
            return MoveEvent::Rejected;
        };

        if self.state.has_closed_exits() && !next.has_closed_exits() {
            log::info!("all goals complete, exits are open");
        }

        let before = self.state.goals_completed();
        let after = next.goals_completed();
        let total = next.total_goals();
        let escaped = next.is_at_exit();
        let moves = next.moves();

        let previous = std::mem::replace(
            &mut self.state,
            if escaped { next.complete() } else { next },
        );
        self.history.push(previous);
        log::debug!("move {} to {} (moves: {})", direction, self.state.player(), moves);

        if escaped {
            log::info!("level {} escaped in {} moves", self.level_index + 1, moves);
            MoveEvent::Escaped { moves }
        } else if after > before {
            log::info!("{}/{} blocks in place", after, total);
            MoveEvent::GoalPlaced {
                completed: after,
                total,
            }
        } else if after < before {
            log::info!("block removed from goal, {}/{} in place", after, total);
            MoveEvent::GoalLost {
                completed: after,
                total,
            }
        } else {
            MoveEvent::Moved
        }
    }

    /// Step back to the state before the last accepted move.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.state = previous;
                log::debug!("undo to move {}", self.state.moves());
                true
            }
            None => false,
        }
    }

    /// Restart the current level.
    pub fn reset(&mut self) -> Result<(), LevelError> {
        self.goto_level(self.level_index)
    }

    pub fn goto_level(&mut self, index: usize) -> Result<(), LevelError> {
        self.state = self.levels.start_level(index)?;
        self.level_index = index;
        self.history.clear();
        log::debug!("started level {} of {}", index + 1, self.levels.len());
        Ok(())
    }

    /// Advance to the next level; false when already on the last one.
    pub fn next_level(&mut self) -> Result<bool, LevelError> {
        if self.level_index + 1 >= self.levels.len() {
            log::info!("no level after {}", self.level_index + 1);
            return Ok(false);
        }
        self.goto_level(self.level_index + 1)?;
        Ok(true)
    }

    /// Go back to the previous level; false when already on the first one.
    pub fn prev_level(&mut self) -> Result<bool, LevelError> {
        if self.level_index == 0 {
            return Ok(false);
        }
        self.goto_level(self.level_index - 1)?;
        Ok(true)
    }
}
