use std::fs;
use std::ops::Index;
use std::path::Path;

use crate::error::{LevelError, MalformedLevel};
use crate::game::GameState;
use crate::grid::{Cell, Grid, Position};

const BUILTIN: &str = include_str!("../levels/classic.txt");

/// A named level as authored, still carrying its `P` start marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: usize,
    pub name: String,
    pub grid: Grid,
}

impl Level {
    /// Locate the player start, replace it with floor and return the cleaned
    /// grid along with the start position.
    pub fn load(&self) -> Result<(Grid, Position), MalformedLevel> {
        let mut starts = self.grid.positions_of(Cell::PlayerStart);
        let player = starts.next().ok_or(MalformedLevel::MissingPlayer)?;
        if let Some(second) = starts.next() {
            return Err(MalformedLevel::MultiplePlayers {
                first: player,
                second,
            });
        }

        let mut grid = self.grid.clone();
        grid[player] = Cell::Floor;
        Ok((grid, player))
    }

    /// Initial game state for this level.
    pub fn start(&self) -> Result<GameState, MalformedLevel> {
        let (grid, player) = self.load()?;
        Ok(GameState::start(grid, player))
    }
}

/// An ordered catalogue of levels.
#[derive(Debug, Clone)]
pub struct Levels {
    levels: Vec<Level>,
}

impl Levels {
    /// Parse levels from a string.
    ///
    /// The format uses:
    /// - Lines starting with `;` to begin a new level; the rest of the line
    ///   is the level name
    /// - Grid rows in the level alphabet (`#`, `.`, `B`, `P`, `E`, `G`, `C`)
    /// - Empty lines between levels (optional)
    ///
    /// Every level is validated, so a malformed one fails the whole catalogue.
    pub fn from_text(contents: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current_level = String::new();
        let mut current_name: Option<String> = None;

        for line in contents.lines() {
            let trimmed = line.trim();

            if let Some(name) = trimmed.strip_prefix(';') {
                if !current_level.is_empty() {
                    levels.push(Self::parse_level(
                        levels.len() + 1,
                        current_name.take(),
                        &current_level,
                    )?);
                    current_level.clear();
                }
                let name = name.trim();
                current_name = (!name.is_empty()).then(|| name.to_string());
                continue;
            }

            // Empty line ends the level being read, if any
            if trimmed.is_empty() {
                if !current_level.is_empty() {
                    levels.push(Self::parse_level(
                        levels.len() + 1,
                        current_name.take(),
                        &current_level,
                    )?);
                    current_level.clear();
                }
                continue;
            }

            current_level.push_str(line);
            current_level.push('\n');
        }

        if !current_level.is_empty() {
            levels.push(Self::parse_level(
                levels.len() + 1,
                current_name.take(),
                &current_level,
            )?);
        }

        log::debug!("parsed {} level(s)", levels.len());
        Ok(Levels { levels })
    }

    fn parse_level(id: usize, name: Option<String>, text: &str) -> Result<Level, LevelError> {
        let malformed = |source| LevelError::Malformed { level: id, source };

        let grid = Grid::from_text(text).map_err(malformed)?;
        let level = Level {
            id,
            name: name.unwrap_or_else(|| format!("Level {}", id)),
            grid,
        };
        level.load().map_err(malformed)?;
        Ok(level)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// The catalogue shipped with the game.
    pub fn builtin() -> Result<Self, LevelError> {
        Self::from_text(BUILTIN)
    }

    /// Get the nth level (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    pub fn level(&self, index: usize) -> Result<&Level, LevelError> {
        self.get(index).ok_or(LevelError::NotFound {
            index,
            count: self.len(),
        })
    }

    pub fn load_level(&self, index: usize) -> Result<(Grid, Position), LevelError> {
        let level = self.level(index)?;
        level.load().map_err(|source| LevelError::Malformed {
            level: level.id,
            source,
        })
    }

    pub fn start_level(&self, index: usize) -> Result<GameState, LevelError> {
        let (grid, player) = self.load_level(index)?;
        Ok(GameState::start(grid, player))
    }
}

impl Index<usize> for Levels {
    type Output = Level;

    fn index(&self, index: usize) -> &Self::Output {
        &self.levels[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;

    #[test]
    fn test_from_text_basic() {
        let level1 = "#####
#P.E#
#####";

        let level2 = "######
#P.BG#
#...C#
######";

        let contents = format!("; Corridor\n\n{}\n\n; Push\n{}\n\n{}\n", level1, level2, level1);
        let levels = Levels::from_text(&contents).unwrap();

        assert_eq!(levels.len(), 3);
        assert_eq!(levels.get(0).unwrap().name, "Corridor");
        assert_eq!(levels.get(1).unwrap().name, "Push");
        assert_eq!(levels.get(2).unwrap().name, "Level 3");
        assert_eq!(
            levels.iter().map(|level| level.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        // Levels keep their start marker and print back as written
        assert_eq!(levels.get(0).unwrap().grid.to_string().trim_end(), level1);
        assert_eq!(levels.get(1).unwrap().grid.to_string().trim_end(), level2);
    }

    #[test]
    fn test_load_level_extracts_player() {
        let levels = Levels::from_text("; One\n#####\n#.P.#\n#####\n").unwrap();
        let (grid, player) = levels.load_level(0).unwrap();

        assert_eq!(player, Position::new(2, 1));
        assert_eq!(grid[player], Cell::Floor);
        assert_eq!(grid.positions_of(Cell::PlayerStart).count(), 0);
        // The catalogue itself is untouched
        assert_eq!(
            levels.get(0).unwrap().grid[player],
            Cell::PlayerStart
        );
    }

    #[test]
    fn test_load_level_out_of_range() {
        let levels = Levels::from_text("#P#\n").unwrap();
        let result = levels.load_level(1);
        assert!(matches!(
            result,
            Err(LevelError::NotFound { index: 1, count: 1 })
        ));
        assert!(levels.start_level(7).is_err());
    }

    #[test]
    fn test_missing_player() {
        let result = Levels::from_text("; 1\n####\n#..#\n####\n");
        assert!(matches!(
            result,
            Err(LevelError::Malformed {
                level: 1,
                source: MalformedLevel::MissingPlayer
            })
        ));
    }

    #[test]
    fn test_multiple_players() {
        let result = Levels::from_text("#P.#\n\n#PP#\n");
        assert!(matches!(
            result,
            Err(LevelError::Malformed {
                level: 2,
                source: MalformedLevel::MultiplePlayers { .. }
            })
        ));

        let level = Level {
            id: 1,
            name: "twins".to_string(),
            grid: Grid::from_text("P.P").unwrap(),
        };
        assert_eq!(
            level.load(),
            Err(MalformedLevel::MultiplePlayers {
                first: Position::new(0, 0),
                second: Position::new(2, 0)
            })
        );
    }

    #[test]
    fn test_ragged_level() {
        let result = Levels::from_text("; bad\n####\n#P#\n####\n");
        assert!(matches!(
            result,
            Err(LevelError::Malformed {
                level: 1,
                source: MalformedLevel::Ragged { row: 1, .. }
            })
        ));
    }

    #[test]
    fn test_from_file_no_file() {
        let result = Levels::from_file("nonexistent_file.txt");
        assert!(matches!(result, Err(LevelError::Io(_))));
    }

    #[test]
    fn test_start_seeds_goal_counts() {
        let levels = Levels::from_text("; seeded\n.G.\nPB.\n.BG\n").unwrap();
        let state = levels.start_level(0).unwrap();

        assert_eq!(state.total_goals(), 2);
        assert_eq!(state.goals_completed(), 2);
        assert_eq!(state.moves(), 0);
        assert!(!state.is_completed());
    }

    #[test]
    fn test_builtin_levels_parse() {
        let levels = Levels::builtin().unwrap();
        assert_eq!(levels.len(), 5);
        for level in levels.iter() {
            let state = level.start().unwrap();
            assert_eq!(state.goals_completed(), 0, "level {}", level.name);
        }
    }

    #[test]
    fn test_builtin_level_is_solvable() {
        let levels = Levels::builtin().unwrap();
        let level = levels.get(2).unwrap();
        assert_eq!(level.name, "Two Crates");

        let mut state = level.start().unwrap();
        assert_eq!(state.total_goals(), 2);
        for ch in "RDDRDLUUURRRRDDLDRLLD".chars() {
            let direction = Direction::from_symbol(ch).unwrap();
            state = state.attempt_move(direction).into_state().unwrap();
        }

        assert_eq!(state.goals_completed(), 2);
        assert!(!state.has_closed_exits());
        assert!(state.is_at_exit());
        assert_eq!(state.moves(), 21);
    }
}
