// SPDX-License-Identifier: MIT OR Apache-2.0
//! Line commands read from the console.

use crate::library::{read_metadata, ImportError};
use crate::state::ConsoleState;
use ledctl_sequencer::{
    PlaybackError, Player, Sequence, SequenceId, SequenceKind, SequenceStore, StoreError, TickOutcome,
};
use std::path::PathBuf;
use std::str::FromStr;

const HELP: &str = "\
commands:
  list                 show library sequences
  play <id> [step]     start a sequence, optionally at a step
  pause | resume       pause or resume playback
  stop                 stop playback
  next | prev          jump to the next or previous step
  tick <secs>          advance playback by hand
  status               print the playback session
  import <path>        add a binary sequence file
  inspect <path>       validate a binary sequence file
  delete <id>          remove a sequence
  help | quit";

/// Error type for parsing and running commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Blank line
    #[error("Empty command")]
    Empty,

    /// First word is not a command
    #[error("Unknown command `{0}` (try `help`)")]
    Unknown(String),

    /// Required argument was not given
    #[error("`{command}` needs {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// What is missing
        argument: &'static str,
    },

    /// Argument is not an integer
    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    /// Player refused the operation
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Library refused the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Binary file could not be read or parsed
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Session could not be rendered
    #[error("Failed to render status: {0}")]
    Json(#[from] serde_json::Error),
}

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// List the library
    List,
    /// Start a sequence
    Play {
        /// Sequence to start
        id: SequenceId,
        /// Step to start at
        from_step: Option<i64>,
    },
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Stop playback
    Stop,
    /// Next step
    Next,
    /// Previous step
    Prev,
    /// Advance by a number of seconds
    Tick(i64),
    /// Print the session
    Status,
    /// Import a binary sequence file
    Import(PathBuf),
    /// Validate a binary sequence file
    Inspect(PathBuf),
    /// Delete a sequence
    Delete(SequenceId),
    /// Print usage
    Help,
    /// Leave the console
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };

        let command = match name.to_lowercase().as_str() {
            "list" | "ls" => Self::List,
            "play" => {
                let id = SequenceId::from(required(&mut words, "play", "a sequence id")?);
                let from_step = match words.next() {
                    Some(step) => Some(parse_number(step)?),
                    None => None,
                };
                Self::Play { id, from_step }
            }
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "prev" | "previous" => Self::Prev,
            "tick" => Self::Tick(parse_number(required(&mut words, "tick", "a number of seconds")?)?),
            "status" => Self::Status,
            "import" => Self::Import(PathBuf::from(required(&mut words, "import", "a file path")?)),
            "inspect" => Self::Inspect(PathBuf::from(required(&mut words, "inspect", "a file path")?)),
            "delete" | "rm" => Self::Delete(SequenceId::from(required(&mut words, "delete", "a sequence id")?)),
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    words
        .next()
        .ok_or(CommandError::MissingArgument { command, argument })
}

fn parse_number(word: &str) -> Result<i64, CommandError> {
    word.parse()
        .map_err(|_| CommandError::InvalidNumber(word.to_string()))
}

/// Result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to print
    Text(String),
    /// Leave the console
    Quit,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Run a command against the console state
pub fn execute(command: ConsoleCommand, state: &mut ConsoleState) -> Result<Reply, CommandError> {
    let reply = match command {
        ConsoleCommand::List => Reply::Text(list(state)),
        ConsoleCommand::Play { id, from_step } => {
            let mut player = state.player.lock();
            player.play_from(&state.library, &id, from_step.unwrap_or(0))?;
            Reply::Text(format!("playing {id} from step {}", current_step(&player)))
        }
        ConsoleCommand::Pause => {
            state.player.lock().pause()?;
            Reply::text("paused")
        }
        ConsoleCommand::Resume => {
            state.player.lock().resume()?;
            Reply::text("playing")
        }
        ConsoleCommand::Stop => match state.player.lock().stop() {
            Some(session) => Reply::Text(format!("stopped {}", session.sequence_id)),
            None => Reply::text("already stopped"),
        },
        ConsoleCommand::Next => {
            let mut player = state.player.lock();
            player.next_step()?;
            Reply::Text(format!("step {}", current_step(&player)))
        }
        ConsoleCommand::Prev => {
            let mut player = state.player.lock();
            player.previous_step()?;
            Reply::Text(format!("step {}", current_step(&player)))
        }
        ConsoleCommand::Tick(secs) => {
            let outcome = state.player.lock().tick(secs)?;
            Reply::text(match outcome {
                TickOutcome::Idle => "idle".to_string(),
                TickOutcome::Running => "running".to_string(),
                TickOutcome::Advanced { count } => format!("advanced {count} step(s)"),
                TickOutcome::Finished => "finished".to_string(),
            })
        }
        ConsoleCommand::Status => match state.player.lock().session() {
            Some(session) => Reply::Text(serde_json::to_string_pretty(session)?),
            None => Reply::text("stopped"),
        },
        ConsoleCommand::Import(path) => {
            let id = state.library.import_binary(&path)?;
            Reply::Text(format!("imported {id}"))
        }
        ConsoleCommand::Inspect(path) => {
            let meta = read_metadata(&path)?;
            Reply::Text(format!(
                "version {}, {} channels, {} frames, {} ms/frame ({} fps), {} s",
                meta.version(),
                meta.channel_count(),
                meta.frame_count(),
                meta.step_time_ms(),
                meta.frame_rate(),
                meta.duration_secs()
            ))
        }
        ConsoleCommand::Delete(id) => {
            {
                let mut player = state.player.lock();
                if player.loaded_sequence_id() == Some(&id) {
                    player.stop();
                }
            }
            let removed = state.library.delete_sequence(&id)?;
            Reply::Text(format!("deleted {} ({})", removed.id, removed.name))
        }
        ConsoleCommand::Help => Reply::text(HELP),
        ConsoleCommand::Quit => Reply::Quit,
    };
    Ok(reply)
}

fn current_step(player: &Player) -> usize {
    player.session().map_or(0, |s| s.current_step_index)
}

fn list(state: &ConsoleState) -> String {
    if state.library.is_empty() {
        return "library is empty".to_string();
    }

    state
        .library
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe(sequence: &Sequence) -> String {
    let detail = match sequence.kind() {
        SequenceKind::Steps(body) => format!("{} step(s)", body.steps.len()),
        SequenceKind::Binary(body) => format!("{} s", body.metadata.duration_secs()),
    };
    let looping = if sequence.is_looping() { ", loop" } else { "" };
    format!(
        "{}  [{}] {} ({detail}{looping})",
        sequence.id,
        sequence.sequence_type().name(),
        sequence.name
    )
}
