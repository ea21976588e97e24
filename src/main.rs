mod error;
mod game;
mod grid;
mod levels;
mod session;
mod versus;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::game::count_goal_cells;
use crate::grid::Direction;
use crate::levels::Levels;
use crate::session::{MoveEvent, Session};
use crate::versus::{Player, Race, RaceStatus};

#[derive(Parser)]
#[command(name = "boxmaze")]
#[command(about = "Push blocks onto goals and escape the maze", long_about = None)]
struct Args {
    /// Path to a levels file (defaults to the built-in levels)
    #[arg(short, long, value_name = "FILE", global = true)]
    levels: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the levels in the catalogue
    List,

    /// Print a level's starting board
    Show {
        /// Level number (1-indexed)
        #[arg(value_name = "LEVEL")]
        level: usize,
    },

    /// Play interactively: u/d/l/r move, z undo, x reset, n/p next/previous level, q quit
    Play {
        /// Level number to start on (1-indexed)
        #[arg(value_name = "LEVEL", default_value = "1")]
        level: usize,
    },

    /// Apply a string of moves (u/d/l/r) to a level and report the result
    Replay {
        /// Level number (1-indexed)
        #[arg(value_name = "LEVEL")]
        level: usize,

        /// Moves to apply, e.g. "rrdl"
        #[arg(value_name = "MOVES")]
        moves: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Race two move strings on the same level, one symbol each in turn
    /// (u/d/l/r move, z undo, x restart that player)
    Race {
        /// Level number (1-indexed)
        #[arg(value_name = "LEVEL")]
        level: usize,

        /// Player 1 moves
        #[arg(value_name = "P1_MOVES")]
        player_one: String,

        /// Player 2 moves
        #[arg(value_name = "P2_MOVES")]
        player_two: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct PlayerSummary {
    moves: u32,
    rejected: usize,
    goals_completed: usize,
    total_goals: usize,
    escaped: bool,
    board: String,
}

impl PlayerSummary {
    fn new(session: &Session, rejected: usize) -> Self {
        let state = session.state();
        PlayerSummary {
            moves: state.moves(),
            rejected,
            goals_completed: state.goals_completed(),
            total_goals: state.total_goals(),
            escaped: state.is_completed(),
            board: state.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ReplaySummary {
    level: usize,
    name: String,
    #[serde(flatten)]
    player: PlayerSummary,
}

#[derive(Serialize)]
struct RaceSummary {
    level: usize,
    name: String,
    status: RaceStatus,
    winner: Option<Player>,
    player_one: PlayerSummary,
    player_two: PlayerSummary,
}

fn load_levels(path: Option<&PathBuf>) -> Result<Arc<Levels>> {
    let levels = match path {
        Some(path) => Levels::from_file(path)
            .with_context(|| format!("loading levels from {}", path.display()))?,
        None => Levels::builtin().context("loading built-in levels")?,
    };
    if levels.is_empty() {
        bail!("the level catalogue is empty");
    }
    Ok(Arc::new(levels))
}

/// Convert a 1-indexed level number from the command line to a catalogue index.
fn level_index(levels: &Levels, number: usize) -> Result<usize> {
    let Some(index) = number.checked_sub(1) else {
        bail!("level numbers must be at least 1");
    };
    levels
        .level(index)
        .with_context(|| format!("level {} not found", number))?;
    Ok(index)
}

/// Parse a move symbol; unknown symbols are logged and count as rejected moves.
fn parse_move(ch: char) -> Option<Direction> {
    let direction = Direction::from_symbol(ch);
    if direction.is_none() {
        log::warn!("unknown move symbol {:?}, treating as rejected", ch);
    }
    direction
}

fn print_status(session: &Session) {
    let state = session.state();
    let level = session.level();
    println!(
        "Level {}/{} - {}  moves: {}  goals: {}/{}",
        level.id,
        session.level_count(),
        level.name,
        state.moves(),
        state.goals_completed(),
        state.total_goals()
    );
    print!("{}", state);
}

fn report_event(event: MoveEvent) {
    match event {
        MoveEvent::GoalPlaced { completed, total } => {
            println!("{}/{} blocks in place", completed, total)
        }
        MoveEvent::GoalLost { completed, total } => {
            println!("Block moved off a goal, {}/{} in place", completed, total)
        }
        MoveEvent::Escaped { moves } => println!("Level complete! You escaped in {} moves", moves),
        MoveEvent::Ignored | MoveEvent::Rejected | MoveEvent::Moved => {}
    }
}

fn list(levels: &Levels) {
    for level in levels.iter() {
        println!(
            "level: {:<3}  name: {:<20}  size: {}x{}  goals: {}",
            level.id,
            level.name,
            level.grid.width(),
            level.grid.height(),
            count_goal_cells(&level.grid)
        );
    }
}

fn show(levels: &Levels, number: usize) -> Result<()> {
    let level = &levels[level_index(levels, number)?];
    println!("Level {} - {}:\n{}", level.id, level.name, level.grid);
    Ok(())
}

fn play(levels: Arc<Levels>, number: usize) -> Result<()> {
    let index = level_index(&levels, number)?;
    let mut session = Session::new(levels, index)?;
    print_status(&session);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading input")?;
        for ch in line.chars().filter(|ch| !ch.is_whitespace()) {
            match ch.to_ascii_lowercase() {
                'q' => return Ok(()),
                'z' if session.can_undo() => {
                    session.undo();
                }
                'z' => println!("Nothing to undo"),
                'x' => session.reset()?,
                'n' => {
                    if !session.next_level()? {
                        println!("You've completed all levels!");
                    }
                }
                'p' => {
                    session.prev_level()?;
                }
                other => {
                    if let Some(direction) = parse_move(other) {
                        report_event(session.try_move(direction));
                    }
                }
            }
        }
        print_status(&session);
        io::stdout().flush()?;
    }
    Ok(())
}

fn replay(levels: Arc<Levels>, number: usize, moves: &str, json: bool) -> Result<()> {
    let index = level_index(&levels, number)?;
    let mut session = Session::new(levels, index)?;
    let mut rejected = 0;

    for ch in moves.chars().filter(|ch| !ch.is_whitespace()) {
        let event = match parse_move(ch) {
            Some(direction) => session.try_move(direction),
            None => MoveEvent::Rejected,
        };
        if event == MoveEvent::Rejected {
            rejected += 1;
        }
        if !json && event.has_update() {
            report_event(event);
        }
    }

    let level = session.level();
    let summary = ReplaySummary {
        level: level.id,
        name: level.name.clone(),
        player: PlayerSummary::new(&session, rejected),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_status(&session);
        println!(
            "escaped: {}  moves: {}  rejected: {}",
            if summary.player.escaped { 'Y' } else { 'N' },
            summary.player.moves,
            summary.player.rejected
        );
    }
    Ok(())
}

fn race(
    levels: Arc<Levels>,
    number: usize,
    player_one: &str,
    player_two: &str,
    json: bool,
) -> Result<()> {
    let index = level_index(&levels, number)?;
    let mut race = Race::new(levels, index)?;
    let mut rejected = [0usize; 2];

    let mut moves_one = player_one.chars().filter(|ch| !ch.is_whitespace());
    let mut moves_two = player_two.chars().filter(|ch| !ch.is_whitespace());
    loop {
        let turns = [(Player::One, moves_one.next()), (Player::Two, moves_two.next())];
        if turns.iter().all(|(_, ch)| ch.is_none()) {
            break;
        }

        for (slot, (player, ch)) in turns.into_iter().enumerate() {
            let Some(ch) = ch else { continue };
            match ch.to_ascii_lowercase() {
                'z' => {
                    race.undo_player(player);
                }
                'x' => race.reset_player(player)?,
                other => {
                    let event = match parse_move(other) {
                        Some(direction) => race.move_player(player, direction),
                        None => MoveEvent::Rejected,
                    };
                    if event == MoveEvent::Rejected {
                        rejected[slot] += 1;
                    }
                }
            }
        }
    }

    let level = race.session(Player::One).level();
    let summary = RaceSummary {
        level: level.id,
        name: level.name.clone(),
        status: race.status(),
        winner: race.winner(),
        player_one: PlayerSummary::new(race.session(Player::One), rejected[0]),
        player_two: PlayerSummary::new(race.session(Player::Two), rejected[1]),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for (player, result) in [
        (Player::One, &summary.player_one),
        (Player::Two, &summary.player_two),
    ] {
        println!(
            "{}: moves: {}  rejected: {}  goals: {}/{}\n{}",
            player,
            result.moves,
            result.rejected,
            result.goals_completed,
            result.total_goals,
            result.board
        );
    }
    match summary.winner {
        Some(winner) => println!("{} wins!", winner),
        None => println!("Nobody escaped"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let levels = load_levels(args.levels.as_ref())?;

    match args.command {
        Command::List => list(&levels),
        Command::Show { level } => show(&levels, level)?,
        Command::Play { level } => play(levels, level)?,
        Command::Replay { level, moves, json } => replay(levels, level, &moves, json)?,
        Command::Race {
            level,
            player_one,
            player_two,
            json,
        } => race(levels, level, &player_one, &player_two, json)?,
    }
    Ok(())
}
