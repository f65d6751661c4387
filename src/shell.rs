//! Line-oriented command shell over a `Catalog`.
//!
//! Each input line is parsed with clap as if it were a command line without
//! the binary name. Positions typed at the prompt are 1-based and converted
//! before they reach the catalog. Errors are printed and the session carries
//! on; only I/O failures on the session streams end it.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError, Dashboard};
use crate::playlist::PlaylistSummary;
use crate::rating::RatingError;
use crate::sequence::SequenceError;
use crate::track::{MAX_RATING, TrackRef, is_valid_rating};

const PROMPT: &str = "playwise> ";

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("positions start at 1")]
    ZeroPosition,
    #[error("position {position} is out of range (playlist has {len} tracks)")]
    Position { position: usize, len: usize },
    #[error(transparent)]
    Catalog(CatalogError),
    #[error("{0}")]
    Parse(#[from] clap::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SequenceError> for ShellError {
    fn from(e: SequenceError) -> Self {
        match e {
            SequenceError::OutOfRange { index, len } => Self::Position {
                position: index + 1,
                len,
            },
        }
    }
}

impl From<CatalogError> for ShellError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Sequence(e) => e.into(),
            other => Self::Catalog(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// Whether the session should keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Show the playlist
    List,

    /// Append a known track, looked up by id or title
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Create a new unrated track and append it
    New {
        #[arg(long, required = true, num_args = 1..)]
        title: Vec<String>,

        #[arg(long, required = true, num_args = 1..)]
        artist: Vec<String>,

        #[arg(long)]
        duration_ms: u64,
    },

    /// Remove the track at a playlist position
    Delete { position: usize },

    /// Move a track between playlist positions
    Move { from: usize, to: usize },

    /// Reverse the playlist
    Reverse,

    /// Play the track at a playlist position
    Play { position: usize },

    /// Undo the last play and queue that track again
    Undo,

    /// Find a track by id or title
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List tracks with a given rating
    Rating { rating: u8 },

    /// Set a track's rating
    Rate { id: String, rating: u8 },

    /// Remove a track from the whole catalog
    Remove { id: String },

    /// Sort the playlist (title, duration_asc, duration_desc)
    Sort { key: String },

    /// Longest tracks, recent plays and rating counts
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// Pin the track at a position so shuffles leave it in place
    Pin { position: usize },

    /// Remove the pin at a position
    Unpin { position: usize },

    /// Shuffle every unpinned position
    Shuffle,

    /// Track count, total duration and distinct artists
    Summary {
        #[arg(long)]
        json: bool,
    },

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Convert a 1-based position typed by the user.
fn to_index(position: usize) -> Result<usize> {
    position.checked_sub(1).ok_or(ShellError::ZeroPosition)
}

pub struct Shell {
    catalog: Catalog,
    dashboard_size: usize,
}

impl Shell {
    pub fn new(catalog: Catalog, dashboard_size: usize) -> Self {
        Self {
            catalog,
            dashboard_size,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read commands until EOF or `quit`, printing results and errors to `out`.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(out)?;
                break;
            }
            let Ok(line) = std::str::from_utf8(&buf) else {
                writeln!(out, "error: input is not valid UTF-8")?;
                continue;
            };
            match self.execute_line(line, out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(ShellError::Io(e)) => return Err(e),
                Err(ShellError::Parse(e)) => write!(out, "{e}")?,
                Err(e) => writeln!(out, "error: {e}")?,
            }
        }
        Ok(())
    }

    pub fn execute_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Flow::Continue);
        }
        let parsed = ShellLine::try_parse_from(words)?;
        self.execute(parsed.command, out)
    }

    pub fn execute<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<Flow> {
        match command {
            ShellCommand::List => {
                if self.catalog.playlist().is_empty() {
                    writeln!(out, "Playlist is empty.")?;
                } else {
                    print_playlist(&self.catalog, out)?;
                }
            }
            ShellCommand::Add { query } => {
                let track = self.catalog.add_to_playlist(&query.join(" "))?;
                writeln!(out, "Added: {track}")?;
            }
            ShellCommand::New {
                title,
                artist,
                duration_ms,
            } => {
                let track =
                    self.catalog
                        .add_new_to_playlist(&title.join(" "), &artist.join(" "), duration_ms);
                writeln!(out, "Created: {track}")?;
            }
            ShellCommand::Delete { position } => {
                let track = self.catalog.playlist_mut().remove(to_index(position)?)?;
                writeln!(out, "Removed from playlist: {track}")?;
            }
            ShellCommand::Move { from, to } => {
                self.catalog
                    .playlist_mut()
                    .move_track(to_index(from)?, to_index(to)?)?;
                writeln!(out, "Moved {from} -> {to}")?;
            }
            ShellCommand::Reverse => {
                self.catalog.playlist_mut().reverse();
                writeln!(out, "Playlist reversed.")?;
            }
            ShellCommand::Play { position } => {
                let track = self.catalog.play(to_index(position)?)?;
                writeln!(out, "Now playing: {track}")?;
            }
            ShellCommand::Undo => match self.catalog.undo_play() {
                Some(track) => writeln!(out, "Re-queued: {track}")?,
                None => writeln!(out, "Nothing to undo.")?,
            },
            ShellCommand::Search { query } => {
                let query = query.join(" ");
                match self.catalog.lookup(&query) {
                    Some(track) => writeln!(out, "{track}")?,
                    None => writeln!(out, "No track matches \"{query}\".")?,
                }
            }
            ShellCommand::Rating { rating } => {
                if !is_valid_rating(rating) {
                    return Err(CatalogError::from(RatingError::InvalidRating(rating)).into());
                }
                let tracks = self.catalog.by_rating(rating);
                if tracks.is_empty() {
                    writeln!(out, "No tracks rated {rating}.")?;
                } else {
                    writeln!(out, "{} tracks rated {}/{}:", tracks.len(), rating, MAX_RATING)?;
                    writeln!(out)?;
                    print_track_table(&tracks, out)?;
                }
            }
            ShellCommand::Rate { id, rating } => {
                let track = self.catalog.rate(&id, rating)?;
                writeln!(out, "Rated: {track}")?;
            }
            ShellCommand::Remove { id } => match self.catalog.remove_track(&id) {
                Some(track) => writeln!(out, "Removed from catalog: {track}")?,
                None => return Err(CatalogError::NotFound(id).into()),
            },
            ShellCommand::Sort { key } => {
                let key = self.catalog.sort_playlist(&key)?;
                writeln!(out, "Sorted by {key}.")?;
            }
            ShellCommand::Dashboard { json } => {
                let dashboard = self.catalog.dashboard(self.dashboard_size);
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&dashboard)?)?;
                } else {
                    print_dashboard(&dashboard, out)?;
                }
            }
            ShellCommand::Pin { position } => {
                self.catalog.playlist_mut().pin_at(to_index(position)?)?;
                writeln!(out, "Pinned position {position}.")?;
            }
            ShellCommand::Unpin { position } => {
                match self.catalog.playlist_mut().unpin(to_index(position)?) {
                    Some(_) => writeln!(out, "Unpinned position {position}.")?,
                    None => writeln!(out, "Position {position} was not pinned.")?,
                }
            }
            ShellCommand::Shuffle => {
                let playlist = self.catalog.playlist_mut();
                playlist.shuffle_keeping_pinned();
                writeln!(out, "Shuffled ({} pinned).", playlist.pins().count())?;
            }
            ShellCommand::Summary { json } => {
                let summary = self.catalog.playlist().summary();
                if json {
                    writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
                } else {
                    print_summary(&summary, out)?;
                }
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

/// Cut `s` to at most `width` characters, ending in `...` when shortened.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn rating_label(track: &TrackRef) -> String {
    if track.is_rated() {
        format!("{}/{}", track.rating(), MAX_RATING)
    } else {
        "-".to_string()
    }
}

/// Print the playlist with 1-based positions and pin markers.
fn print_playlist<W: Write>(catalog: &Catalog, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{:>4} {:<30} {:<20} {:>6} {:>6} {:>3}  {}",
        "#", "Title", "Artist", "Len", "Rating", "Pin", "Id"
    )?;
    writeln!(out, "{}", "-".repeat(95))?;

    for entry in catalog.playlist().entries() {
        let track = &entry.track;
        writeln!(
            out,
            "{:>4} {:<30} {:<20} {:>6} {:>6} {:>3}  {}",
            entry.position + 1,
            truncate(track.title(), 30),
            truncate(track.artist(), 20),
            track.duration_display(),
            rating_label(track),
            if entry.pinned { "*" } else { "" },
            track.id(),
        )?;
    }

    let stale = catalog.playlist().stale_pins();
    if !stale.is_empty() {
        let positions: Vec<String> = stale.iter().map(|p| (p + 1).to_string()).collect();
        writeln!(out)?;
        writeln!(
            out,
            "Pins at {} no longer match the track in place.",
            positions.join(", ")
        )?;
    }
    Ok(())
}

fn print_track_table<W: Write>(tracks: &[TrackRef], out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{:<30} {:<20} {:>6} {:>6}  {}",
        "Title", "Artist", "Len", "Rating", "Id"
    )?;
    writeln!(out, "{}", "-".repeat(85))?;

    for track in tracks {
        writeln!(
            out,
            "{:<30} {:<20} {:>6} {:>6}  {}",
            truncate(track.title(), 30),
            truncate(track.artist(), 20),
            track.duration_display(),
            rating_label(track),
            track.id(),
        )?;
    }
    Ok(())
}

fn print_summary<W: Write>(summary: &PlaylistSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "Playlist Summary")?;
    writeln!(out, "================")?;
    writeln!(out, "Tracks:           {}", summary.track_count)?;
    writeln!(out, "Total duration:   {:.1} min", summary.total_minutes)?;
    writeln!(out, "Distinct artists: {}", summary.distinct_artists)?;
    Ok(())
}

fn print_dashboard<W: Write>(dashboard: &Dashboard, out: &mut W) -> io::Result<()> {
    writeln!(out, "Longest tracks:")?;
    if dashboard.longest.is_empty() {
        writeln!(out, "  (playlist is empty)")?;
    }
    for (rank, track) in dashboard.longest.iter().enumerate() {
        writeln!(out, "  {:>2}. {}", rank + 1, track)?;
    }
    writeln!(out)?;

    writeln!(out, "Recently played:")?;
    if dashboard.recent.is_empty() {
        writeln!(out, "  (nothing played yet)")?;
    }
    for track in &dashboard.recent {
        writeln!(out, "  {track}")?;
    }
    writeln!(out)?;

    writeln!(out, "Ratings:")?;
    for (rating, count) in &dashboard.rating_counts {
        writeln!(out, "  {:<5} {}", "*".repeat(*rating as usize), count)?;
    }
    writeln!(out)?;

    print_summary(&dashboard.summary, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::PlaylistEngine;
    use crate::track::TrackRecord;
    use std::io::Cursor;

    fn record(id: &str, title: &str, artist: &str, duration_ms: u64, rating: u8) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            duration_ms,
            rating: Some(rating),
        }
    }

    fn make_shell() -> Shell {
        let mut catalog = Catalog::new(PlaylistEngine::with_seed(5));
        catalog.load(
            vec![
                record("A", "Zeta", "Band One", 200_000, 3),
                record("B", "Alpha", "Band Two", 100_000, 1),
                record("C", "Mono", "Band One", 300_000, 4),
            ],
            100,
        );
        Shell::new(catalog, 5)
    }

    fn run_script(shell: &mut Shell, script: &str) -> String {
        let mut out = Vec::new();
        shell.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn playlist_ids(shell: &Shell) -> Vec<String> {
        shell
            .catalog()
            .playlist()
            .iter()
            .map(|t| t.id().to_string())
            .collect()
    }

    #[test]
    fn test_list_uses_one_based_positions() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "list\n");
        assert!(output.starts_with(PROMPT));
        let first_row = output
            .lines()
            .find(|l| l.contains("Zeta"))
            .unwrap();
        assert!(first_row.trim_start().starts_with("1 "));
    }

    #[test]
    fn test_sort_and_move() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "sort title\nmove 1 3\n");
        assert!(output.contains("Sorted by title."));
        assert!(output.contains("Moved 1 -> 3"));
        assert_eq!(playlist_ids(&shell), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let mut shell = make_shell();
        let output = run_script(
            &mut shell,
            "delete 0\nplay 9\nsort loudness\nrating 7\nfrobnicate\nreverse\n",
        );
        assert!(output.contains("error: positions start at 1"));
        assert!(output.contains("position 9 is out of range (playlist has 3 tracks)"));
        assert!(output.contains("unsupported sort key 'loudness'"));
        assert!(output.contains("rating 7 is outside 1..=5"));
        assert!(output.contains("frobnicate"));
        assert!(output.contains("Playlist reversed."));
        assert_eq!(playlist_ids(&shell), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_bad_encoding_does_not_end_session() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        shell
            .run(Cursor::new(b"search Caf\xe9\nreverse\n".to_vec()), &mut out)
            .unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("error: input is not valid UTF-8"));
        assert!(output.contains("Playlist reversed."));
        assert_eq!(playlist_ids(&shell), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_quit_stops_reading() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "quit\nreverse\n");
        assert!(!output.contains("reversed"));
        assert_eq!(playlist_ids(&shell), vec!["A", "B", "C"]);

        let output = run_script(&mut shell, "exit\n");
        assert_eq!(output, PROMPT);
    }

    #[test]
    fn test_play_and_undo() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "play 2\nundo\nundo\n");
        assert!(output.contains("Now playing: Alpha by Band Two"));
        assert!(output.contains("Re-queued: Alpha by Band Two"));
        assert!(output.contains("Nothing to undo."));
        assert_eq!(playlist_ids(&shell), vec!["A", "B", "C", "B"]);
    }

    #[test]
    fn test_add_multiword_title_and_new_track() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        shell
            .execute_line("new --title Take Five --artist Dave Brubeck --duration-ms 324000", &mut out)
            .unwrap();
        shell.execute_line("add take five", &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Created: Take Five by Dave Brubeck [5:24]"));
        assert!(output.contains("Added: Take Five"));

        let playlist = shell.catalog().playlist();
        assert_eq!(playlist.len(), 5);
        assert_eq!(playlist.get(3).unwrap().id(), playlist.get(4).unwrap().id());
    }

    #[test]
    fn test_rate_and_rating_listing() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "rate C 1\nrating 1\nrating 4\n");
        assert!(output.contains("Rated: Mono"));
        assert!(output.contains("2 tracks rated 1/5:"));
        assert!(output.contains("No tracks rated 4."));
    }

    #[test]
    fn test_remove_unknown_track() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        let err = shell.execute_line("remove nope", &mut out).unwrap_err();
        assert!(matches!(err, ShellError::Catalog(CatalogError::NotFound(_))));

        shell.execute_line("remove A", &mut out).unwrap();
        assert!(shell.catalog().lookup("zeta").is_none());
        assert!(shell.catalog().divergences().is_empty());
    }

    #[test]
    fn test_pin_survives_shuffle_command() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "pin 2\nshuffle\nshuffle\nunpin 2\nunpin 2\n");
        assert!(output.contains("Pinned position 2."));
        assert!(output.contains("Shuffled (1 pinned)."));
        assert!(output.contains("Unpinned position 2."));
        assert!(output.contains("Position 2 was not pinned."));
        assert_eq!(shell.catalog().playlist().get(1).unwrap().id(), "B");
    }

    #[test]
    fn test_summary_json() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        shell.execute_line("summary --json", &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["track_count"], 3);
        assert_eq!(value["total_duration_ms"], 600_000);
        assert_eq!(value["distinct_artists"], 2);
    }

    #[test]
    fn test_dashboard_json() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        shell.execute_line("play 1", &mut out).unwrap();
        out.clear();
        shell.execute_line("dashboard --json", &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["longest"][0]["id"], "C");
        assert_eq!(value["recent"][0]["title"], "Zeta");
        assert_eq!(value["rating_counts"]["3"], 1);
    }

    #[test]
    fn test_dashboard_text() {
        let mut shell = make_shell();
        let output = run_script(&mut shell, "dashboard\n");
        assert!(output.contains("Longest tracks:"));
        assert!(output.contains(" 1. Mono by Band One [5:00]"));
        assert!(output.contains("(nothing played yet)"));
        assert!(output.contains("****  1"));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let mut shell = make_shell();
        let mut out = Vec::new();
        assert_eq!(shell.execute_line("   ", &mut out).unwrap(), Flow::Continue);
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Sigur Rós: Hoppípolla", 10), "Sigur R...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }
}
