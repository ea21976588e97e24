use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::LevelError;
use crate::grid::Direction;
use crate::levels::Levels;
use crate::session::{MoveEvent, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "Player 1"),
            Player::Two => write!(f, "Player 2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceStatus {
    Playing,
    Finished,
}

/// Two players solving the same level side by side; first out wins.
///
/// Each player has an independent [`Session`]; they only share the read-only
/// level catalogue and the level index.
#[derive(Debug, Clone)]
pub struct Race {
    sessions: [Session; 2],
    status: RaceStatus,
    winner: Option<Player>,
}

impl Race {
    pub fn new(levels: Arc<Levels>, level_index: usize) -> Result<Self, LevelError> {
        let sessions = [
            Session::new(levels.clone(), level_index)?,
            Session::new(levels, level_index)?,
        ];
        Ok(Race {
            sessions,
            status: RaceStatus::Playing,
            winner: None,
        })
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn level_index(&self) -> usize {
        self.sessions[0].level_index()
    }

    pub fn session(&self, player: Player) -> &Session {
        &self.sessions[player.index()]
    }

    pub fn move_player(&mut self, player: Player, direction: Direction) -> MoveEvent {
        if self.status != RaceStatus::Playing {
            return MoveEvent::Ignored;
        }

        let event = self.sessions[player.index()].try_move(direction);
        if let MoveEvent::Escaped { moves } = event {
            log::info!("{} wins in {} moves", player, moves);
            self.status = RaceStatus::Finished;
            self.winner = Some(player);
        }
        event
    }

    pub fn undo_player(&mut self, player: Player) -> bool {
        if self.status != RaceStatus::Playing {
            return false;
        }
        self.sessions[player.index()].undo()
    }

    /// Restart one player's level and reopen the race.
    pub fn reset_player(&mut self, player: Player) -> Result<(), LevelError> {
        self.sessions[player.index()].reset()?;
        self.status = RaceStatus::Playing;
        self.winner = None;
        Ok(())
    }

    /// Restart both players on the current level.
    pub fn reset(&mut self) -> Result<(), LevelError> {
        let index = self.level_index();
        self.start_level(index)
    }

    /// Move both players to the next level; false when on the last one.
    pub fn next_level(&mut self) -> Result<bool, LevelError> {
        let next = self.level_index() + 1;
        if next >= self.sessions[0].level_count() {
            return Ok(false);
        }
        self.start_level(next)?;
        Ok(true)
    }

    fn start_level(&mut self, index: usize) -> Result<(), LevelError> {
        for session in &mut self.sessions {
            session.goto_level(index)?;
        }
        self.status = RaceStatus::Playing;
        self.winner = None;
        log::debug!("race on level {}", index + 1);
        Ok(())
    }
}
