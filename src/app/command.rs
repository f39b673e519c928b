//! Console commands
//!
//! One command per input line. Parsing is pure so the front-end can be
//! tested without a terminal.

use std::path::PathBuf;

use thiserror::Error;

use crate::features::EqualizerPreset;
use crate::player::TrackId;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Scan a folder and make it the library
    Scan(PathBuf),
    Play(TrackId),
    Queue(TrackId),
    Album { artist: String, album: String },
    Remove(TrackId),
    Move { from: usize, to: usize },
    Clear,
    /// Play queue entry (1-based as typed, stored 0-based)
    Jump(usize),
    Toggle,
    Next,
    Previous,
    Seek(f64),
    Volume(f32),
    Eq { band: usize, gain_db: f32 },
    Preset(EqualizerPreset),
    Normalization(bool),
    Crossfade { id: TrackId, enabled: bool },
    CrossfadeSecs(f64),
    PlaylistSave(String),
    PlaylistLoad(String),
    PlaylistDelete(String),
    Playlists,
    Search(String),
    List,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
scan <folder>              scan a folder into the library
ls | search <text>         browse the library
play <id> | queue <id>     play now / append to queue
album <artist> / <album>   queue a whole album
remove <id> | clear        edit the queue
move <from> <to> | jump <n>
toggle | next | prev | seek <secs>
vol <0-100> | eq <band 1-5> <db> | preset <name> | norm on|off
xfade <id> on|off | xfade-secs <secs>
playlist save|load|delete <name> | playlists
status | help | quit";

fn parse_num<T: std::str::FromStr>(arg: Option<&str>, usage: &'static str) -> Result<T, CommandError> {
    arg.and_then(|a| a.parse().ok())
        .ok_or(CommandError::Usage(usage))
}

fn parse_switch(arg: Option<&str>, usage: &'static str) -> Result<bool, CommandError> {
    match arg.map(|a| a.to_ascii_lowercase()).as_deref() {
        Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

/// 1-based index as typed by the user
fn parse_position(arg: Option<&str>, usage: &'static str) -> Result<usize, CommandError> {
    let n: usize = parse_num(arg, usage)?;
    n.checked_sub(1).ok_or(CommandError::Usage(usage))
}

fn rest_of(line: &str, usage: &'static str) -> Result<String, CommandError> {
    let rest = line
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("");
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(CommandError::Unknown(String::new()));
    };
    let arg = words.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "scan" => Command::Scan(PathBuf::from(rest_of(line, "scan <folder>")?)),
        "play" => Command::Play(parse_num(arg, "play <id>")?),
        "queue" | "add" => Command::Queue(parse_num(arg, "queue <id>")?),
        "album" => {
            const USAGE: &str = "album <artist> / <album>";
            let rest = rest_of(line, USAGE)?;
            let (artist, album) = rest.split_once('/').ok_or(CommandError::Usage(USAGE))?;
            let (artist, album) = (artist.trim(), album.trim());
            if artist.is_empty() || album.is_empty() {
                return Err(CommandError::Usage(USAGE));
            }
            Command::Album {
                artist: artist.to_string(),
                album: album.to_string(),
            }
        }
        "remove" | "rm" => Command::Remove(parse_num(arg, "remove <id>")?),
        "move" | "mv" => {
            const USAGE: &str = "move <from> <to>";
            Command::Move {
                from: parse_position(arg, USAGE)?,
                to: parse_position(words.next(), USAGE)?,
            }
        }
        "clear" => Command::Clear,
        "jump" => Command::Jump(parse_position(arg, "jump <queue position>")?),
        "toggle" | "p" => Command::Toggle,
        "next" | "n" => Command::Next,
        "prev" | "previous" => Command::Previous,
        "seek" => Command::Seek(parse_num(arg, "seek <seconds>")?),
        "vol" | "volume" => Command::Volume(parse_num(arg, "vol <0-100>")?),
        "eq" => {
            const USAGE: &str = "eq <band 1-5> <db>";
            Command::Eq {
                band: parse_position(arg, USAGE)?,
                gain_db: parse_num(words.next(), USAGE)?,
            }
        }
        "preset" => {
            const USAGE: &str = "preset flat|bass|treble|rock|pop|jazz|classical|custom";
            let preset = arg
                .and_then(EqualizerPreset::from_name)
                .ok_or(CommandError::Usage(USAGE))?;
            Command::Preset(preset)
        }
        "norm" => Command::Normalization(parse_switch(arg, "norm on|off")?),
        "xfade" => {
            const USAGE: &str = "xfade <id> on|off";
            Command::Crossfade {
                id: parse_num(arg, USAGE)?,
                enabled: parse_switch(words.next(), USAGE)?,
            }
        }
        "xfade-secs" => Command::CrossfadeSecs(parse_num(arg, "xfade-secs <seconds>")?),
        "playlist" => {
            const USAGE: &str = "playlist save|load|delete <name>";
            let rest = rest_of(line, USAGE)?;
            let (action, name) = rest
                .split_once(char::is_whitespace)
                .map(|(a, n)| (a, n.trim().to_string()))
                .ok_or(CommandError::Usage(USAGE))?;
            match action.to_ascii_lowercase().as_str() {
                "save" => Command::PlaylistSave(name),
                "load" => Command::PlaylistLoad(name),
                "delete" | "rm" => Command::PlaylistDelete(name),
                _ => return Err(CommandError::Usage(USAGE)),
            }
        }
        "playlists" => Command::Playlists,
        "search" | "find" => Command::Search(rest_of(line, "search <text>")?),
        "ls" | "list" => Command::List,
        "status" | "st" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}
