//! CSV ingestion.
//!
//! The reader needs a header row naming `SongName`, `ArtistName`,
//! `Duration_ms` and `Popularity`. Any other columns are ignored. Rows that
//! cannot be parsed are logged and skipped rather than failing the load.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use rand::Rng;
use thiserror::Error;

use crate::track::{MAX_RATING, MIN_RATING, TrackRecord};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV input is empty")]
    Empty,
    #[error("CSV header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

pub type Result<T> = std::result::Result<T, IngestError>;

pub const REQUIRED_COLUMNS: [&str; 4] = ["SongName", "ArtistName", "Duration_ms", "Popularity"];

/// Parsed rows plus the number of data rows that were skipped.
#[derive(Debug, Default)]
pub struct IngestResult {
    pub records: Vec<TrackRecord>,
    pub skipped: usize,
}

struct ColumnMap {
    title: usize,
    artist: usize,
    duration: usize,
    popularity: usize,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self> {
        let mut missing = Vec::new();
        let mut locate = |name: &str| match header.iter().position(|h| h == name) {
            Some(index) => index,
            None => {
                missing.push(name.to_string());
                0
            }
        };
        let [title, artist, duration, popularity] = REQUIRED_COLUMNS;
        let columns = Self {
            title: locate(title),
            artist: locate(artist),
            duration: locate(duration),
            popularity: locate(popularity),
        };
        if missing.is_empty() {
            Ok(columns)
        } else {
            Err(IngestError::MissingColumns(missing))
        }
    }

    fn widest(&self) -> usize {
        self.title
            .max(self.artist)
            .max(self.duration)
            .max(self.popularity)
    }
}

/// Read a CSV file from disk.
pub fn load_csv(path: &Path) -> Result<IngestResult> {
    let file = File::open(path)?;
    let result = read_csv(BufReader::new(file))?;
    log::info!(
        "Read {} tracks from {} ({} rows skipped)",
        result.records.len(),
        path.display(),
        result.skipped
    );
    Ok(result)
}

/// Fill `buf` with the next raw line minus its terminator. Returns false at
/// EOF. The bytes stay undecoded so one badly encoded row cannot fail the
/// whole read.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(true)
}

/// Read CSV rows from any buffered reader. Ratings come from popularity.
pub fn read_csv<R: BufRead>(mut reader: R) -> Result<IngestResult> {
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    let header_line = loop {
        if !next_line(&mut reader, &mut buf)? {
            return Err(IngestError::Empty);
        }
        line_no += 1;
        // Column names are ASCII; a stray byte elsewhere in the header
        // should not hide them.
        let line = String::from_utf8_lossy(&buf).into_owned();
        if !line.trim().is_empty() {
            break line;
        }
    };
    let header: Vec<String> = split_csv_line(header_line.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let columns = ColumnMap::from_header(&header)?;

    let mut result = IngestResult::default();
    let mut sequence = 1u64;

    while next_line(&mut reader, &mut buf)? {
        line_no += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Skipping CSV line {}: not valid UTF-8 ({})", line_no, e);
                result.skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line, &columns) {
            Ok((title, artist, duration_ms, popularity)) => {
                let id = derive_track_id(&title, &artist, sequence);
                sequence += 1;
                result.records.push(TrackRecord {
                    id,
                    title,
                    artist,
                    duration_ms,
                    rating: Some(popularity_to_rating(popularity)),
                });
            }
            Err(reason) => {
                log::warn!("Skipping CSV line {}: {}", line_no, reason);
                result.skipped += 1;
            }
        }
    }

    Ok(result)
}

fn parse_row(line: &str, columns: &ColumnMap) -> std::result::Result<(String, String, u64, i64), String> {
    let fields = split_csv_line(line);
    if fields.len() <= columns.widest() {
        return Err(format!(
            "expected at least {} fields, found {}",
            columns.widest() + 1,
            fields.len()
        ));
    }

    let title = fields[columns.title].trim().to_string();
    let artist = fields[columns.artist].trim().to_string();
    let duration_raw = fields[columns.duration].trim();
    let duration_ms = duration_raw
        .parse::<u64>()
        .map_err(|e| format!("bad Duration_ms '{duration_raw}': {e}"))?;
    let popularity_raw = fields[columns.popularity].trim();
    let popularity = popularity_raw
        .parse::<i64>()
        .map_err(|e| format!("bad Popularity '{popularity_raw}': {e}"))?;

    Ok((title, artist, duration_ms, popularity))
}

/// Split one CSV line on commas, honouring double-quoted fields and `""`
/// escapes inside them.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Map a 0-100 popularity score onto a star rating.
pub fn popularity_to_rating(popularity: i64) -> u8 {
    match popularity {
        p if p >= 80 => 5,
        p if p >= 60 => 4,
        p if p >= 40 => 3,
        p if p >= 20 => 2,
        _ => 1,
    }
}

/// Strip every whitespace character.
pub fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn derive_track_id(title: &str, artist: &str, sequence: u64) -> String {
    format!("{}{}{}", compact(title), compact(artist), sequence)
}

/// Replace every record's rating with one drawn uniformly from 1..=5.
pub fn assign_random_ratings<R: Rng>(records: &mut [TrackRecord], rng: &mut R) {
    for record in records.iter_mut() {
        record.rating = Some(rng.random_range(MIN_RATING..=MAX_RATING));
    }
    log::debug!("Assigned random ratings to {} tracks", records.len());
}
