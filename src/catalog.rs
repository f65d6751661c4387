//! The catalog owns one of each index plus the playlist and playback history,
//! and keeps them in step.
//!
//! The individual structures never update each other: removing a track from
//! the identity index leaves it in the rating index, and so on. `Catalog` is
//! the layer that tightens that. Every mutating method here touches all the
//! structures it needs to, and `divergences()` reports anything that slipped
//! through. Mutating a component directly through `playlist_mut()` is still
//! allowed and keeps the component-level contract, since the playlist is a
//! view over the catalog rather than a source of truth.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::history::PlaybackHistory;
use crate::identity::IdentityIndex;
use crate::ingest::compact;
use crate::playlist::{PlaylistEngine, PlaylistSummary};
use crate::rating::{RatingError, RatingIndex};
use crate::sequence::SequenceError;
use crate::sort::{SortError, SortKey, sort_tracks};
use crate::track::{Track, TrackRecord, TrackRef, is_valid_rating};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("track id '{0}' is already registered")]
    DuplicateId(String),
    #[error("no track matches '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Rating(#[from] RatingError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Sort(#[from] SortError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub registered: usize,
    pub rated: usize,
    pub queued: usize,
    pub rejected: usize,
}

/// Snapshot of the longest tracks, latest plays and rating distribution.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub longest: Vec<TrackRef>,
    pub recent: Vec<TrackRef>,
    pub rating_counts: BTreeMap<u8, usize>,
    pub summary: PlaylistSummary,
}

/// A cross-structure inconsistency found by `Catalog::divergences`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    PlaylistUnknown { position: usize, track_id: String },
    RatingUnknown { bucket: u8, track_id: String },
    RatingMismatch { bucket: u8, track_id: String, rating: u8 },
    MissingFromRatings { track_id: String, rating: u8 },
    HistoryUnknown { track_id: String },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaylistUnknown { position, track_id } => {
                write!(f, "playlist position {position} holds unknown track {track_id}")
            }
            Self::RatingUnknown { bucket, track_id } => {
                write!(f, "rating bucket {bucket} holds unknown track {track_id}")
            }
            Self::RatingMismatch { bucket, track_id, rating } => {
                write!(f, "track {track_id} rated {rating} sits in bucket {bucket}")
            }
            Self::MissingFromRatings { track_id, rating } => {
                write!(f, "track {track_id} rated {rating} is missing from the rating index")
            }
            Self::HistoryUnknown { track_id } => {
                write!(f, "playback history holds unknown track {track_id}")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    identity: IdentityIndex,
    ratings: RatingIndex,
    playlist: PlaylistEngine,
    history: PlaybackHistory,
}

impl Catalog {
    pub fn new(playlist: PlaylistEngine) -> Self {
        Self {
            identity: IdentityIndex::new(),
            ratings: RatingIndex::new(),
            playlist,
            history: PlaybackHistory::new(),
        }
    }

    pub fn identity(&self) -> &IdentityIndex {
        &self.identity
    }

    pub fn ratings(&self) -> &RatingIndex {
        &self.ratings
    }

    pub fn playlist(&self) -> &PlaylistEngine {
        &self.playlist
    }

    /// Direct playlist access for order-only edits (delete, move, reverse,
    /// pin, shuffle). These never change catalog membership.
    pub fn playlist_mut(&mut self) -> &mut PlaylistEngine {
        &mut self.playlist
    }

    pub fn history(&self) -> &PlaybackHistory {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
    }

    /// Add a record to the identity index and, when it carries a valid
    /// rating, the rating index. A duplicate id touches nothing. An
    /// out-of-range rating is logged and the track is kept unrated.
    pub fn register(&mut self, record: TrackRecord) -> Result<TrackRef> {
        if self.identity.contains(&record.id) {
            return Err(CatalogError::DuplicateId(record.id));
        }
        let rating = record.rating.filter(|&rating| {
            let valid = is_valid_rating(rating);
            if !valid {
                log::warn!(
                    "Track {} has rating {} outside 1..=5, registering it unrated",
                    record.id,
                    rating
                );
            }
            valid
        });

        let track = record.into_track();
        self.identity.add(track.clone());
        if let Some(rating) = rating {
            self.ratings.insert(track.clone(), rating)?;
        }
        Ok(track)
    }

    /// Register every record and queue the first `playlist_limit` of them.
    /// Rejected records are logged and counted.
    pub fn load(
        &mut self,
        records: impl IntoIterator<Item = TrackRecord>,
        playlist_limit: usize,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for record in records {
            let id = record.id.clone();
            match self.register(record) {
                Ok(track) => {
                    report.registered += 1;
                    if track.is_rated() {
                        report.rated += 1;
                    }
                    if self.playlist.len() < playlist_limit {
                        self.playlist.append(track);
                        report.queued += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Skipping track {}: {}", id, e);
                    report.rejected += 1;
                }
            }
        }
        log::info!(
            "Loaded {} tracks ({} rated, {} queued, {} rejected)",
            report.registered,
            report.rated,
            report.queued,
            report.rejected
        );
        report
    }

    /// Create an unrated track outside of ingestion. Its id is the title and
    /// artist without whitespace followed by the current time in ms.
    pub fn create_track(&mut self, title: &str, artist: &str, duration_ms: u64) -> TrackRef {
        let base = format!(
            "{}{}{}",
            compact(title),
            compact(artist),
            Utc::now().timestamp_millis()
        );
        let mut id = base.clone();
        let mut suffix = 1;
        while self.identity.contains(&id) {
            suffix += 1;
            id = format!("{base}-{suffix}");
        }
        let track = Track::shared(id, title, artist, duration_ms);
        self.identity.add(track.clone());
        log::debug!("Created track {}", track.id());
        track
    }

    /// Look up a known track and append it to the playlist.
    pub fn add_to_playlist(&mut self, query: &str) -> Result<TrackRef> {
        let track = self
            .identity
            .lookup(query)
            .ok_or_else(|| CatalogError::NotFound(query.to_string()))?;
        self.playlist.append(track.clone());
        Ok(track)
    }

    /// Create a track and append it to the playlist.
    pub fn add_new_to_playlist(&mut self, title: &str, artist: &str, duration_ms: u64) -> TrackRef {
        let track = self.create_track(title, artist, duration_ms);
        self.playlist.append(track.clone());
        track
    }

    /// Remove a track from every structure at once.
    pub fn remove_track(&mut self, track_id: &str) -> Option<TrackRef> {
        let track = self.identity.remove(track_id)?;
        let rated = self.ratings.remove(track_id);
        let queued = self.playlist.remove_track_everywhere(track_id);
        let played = self.history.purge(track_id);
        log::info!(
            "Removed {} (rating index: {}, playlist entries: {}, plays: {})",
            track_id,
            rated,
            queued,
            played
        );
        Some(track)
    }

    /// Move a known track into the bucket for `rating`.
    pub fn rate(&mut self, track_id: &str, rating: u8) -> Result<TrackRef> {
        if !is_valid_rating(rating) {
            return Err(RatingError::InvalidRating(rating).into());
        }
        let track = self
            .identity
            .get(track_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(track_id.to_string()))?;
        self.ratings.remove(track_id);
        self.ratings.insert(track.clone(), rating)?;
        Ok(track)
    }

    pub fn lookup(&self, query: &str) -> Option<TrackRef> {
        self.identity.lookup(query)
    }

    pub fn by_rating(&self, rating: u8) -> Vec<TrackRef> {
        self.ratings.search(rating)
    }

    pub fn rating_counts(&self) -> BTreeMap<u8, usize> {
        self.ratings.counts_by_rating()
    }

    /// Record a play of the playlist track at `index`.
    pub fn play(&mut self, index: usize) -> Result<TrackRef> {
        let track = self.playlist.get(index)?.clone();
        self.history.push(track.clone());
        Ok(track)
    }

    /// Pop the last play and queue it again at the end of the playlist.
    pub fn undo_play(&mut self) -> Option<TrackRef> {
        let track = self.history.pop()?;
        self.playlist.append(track.clone());
        Some(track)
    }

    /// Sort the playlist by a key name. Unknown keys leave it untouched.
    pub fn sort_playlist(&mut self, key: &str) -> Result<SortKey> {
        let key: SortKey = key.parse()?;
        self.playlist.sort_by(key);
        Ok(key)
    }

    pub fn dashboard(&self, size: usize) -> Dashboard {
        let mut longest = self.playlist.snapshot();
        sort_tracks(&mut longest, SortKey::DurationDesc);
        longest.truncate(size);
        Dashboard {
            longest,
            recent: self.history.recent(size),
            rating_counts: self.ratings.counts_by_rating(),
            summary: self.playlist.summary(),
        }
    }

    /// Everything in the playlist, rating index and history that does not
    /// agree with the identity index.
    pub fn divergences(&self) -> Vec<Divergence> {
        let mut found = Vec::new();

        for (position, track) in self.playlist.iter().enumerate() {
            if !self.is_registered(track) {
                found.push(Divergence::PlaylistUnknown {
                    position,
                    track_id: track.id().to_string(),
                });
            }
        }

        for (bucket, track) in self.ratings.entries() {
            if !self.is_registered(&track) {
                found.push(Divergence::RatingUnknown {
                    bucket,
                    track_id: track.id().to_string(),
                });
            } else if track.rating() != bucket {
                found.push(Divergence::RatingMismatch {
                    bucket,
                    track_id: track.id().to_string(),
                    rating: track.rating(),
                });
            }
        }

        for track in self.identity.iter() {
            if track.is_rated() && !self.ratings.contains(track.id()) {
                found.push(Divergence::MissingFromRatings {
                    track_id: track.id().to_string(),
                    rating: track.rating(),
                });
            }
        }

        for track in self.history.iter() {
            if !self.is_registered(track) {
                found.push(Divergence::HistoryUnknown {
                    track_id: track.id().to_string(),
                });
            }
        }

        found
    }

    /// True when the identity index holds this very record, not just one
    /// with the same id.
    fn is_registered(&self, track: &TrackRef) -> bool {
        self.identity
            .get(track.id())
            .is_some_and(|known| Rc::ptr_eq(known, track))
    }
}
