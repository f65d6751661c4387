//! The active playlist: an ordered sequence of tracks plus a pin overlay.
//!
//! A pin maps a *position* to the track that was there when the pin was
//! taken. Shuffling keeps pinned positions fixed and permutes the rest. Pins
//! are not adjusted when tracks are inserted, moved or removed around them,
//! so after such edits a pin can name a track that no longer sits at its
//! position (see `stale_pins`). Shuffle honours the pin as recorded.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::sequence::{OrderedSequence, Result};
use crate::sort::{SortKey, sort_tracks};
use crate::track::TrackRef;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Aggregate figures for the current playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub track_count: usize,
    pub total_duration_ms: u64,
    pub total_minutes: f64,
    pub distinct_artists: usize,
}

/// One display row.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub position: usize,
    pub track: TrackRef,
    pub pinned: bool,
}

pub struct PlaylistEngine {
    tracks: OrderedSequence<TrackRef>,
    pins: BTreeMap<usize, TrackRef>,
    rng: Box<dyn RngCore>,
}

impl fmt::Debug for PlaylistEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistEngine")
            .field("tracks", &self.tracks.len())
            .field("pins", &self.pins.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for PlaylistEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistEngine {
    /// Playlist whose shuffles draw from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Playlist with reproducible shuffles.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + 'static) -> Self {
        Self {
            tracks: OrderedSequence::new(),
            pins: BTreeMap::new(),
            rng: Box::new(rng),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn append(&mut self, track: TrackRef) {
        self.tracks.push_back(track);
    }

    pub fn prepend(&mut self, track: TrackRef) {
        self.tracks.push_front(track);
    }

    pub fn insert(&mut self, index: usize, track: TrackRef) -> Result<()> {
        self.tracks.insert(index, track)
    }

    /// Remove the track at `index`. If a pin holds that same track, the
    /// lowest such pin is dropped; other pins keep their positions.
    pub fn remove(&mut self, index: usize) -> Result<TrackRef> {
        let removed = self.tracks.remove(index)?;
        let pinned_at = self
            .pins
            .iter()
            .find(|(_, t)| t.id() == removed.id())
            .map(|(&pos, _)| pos);
        if let Some(pos) = pinned_at {
            self.pins.remove(&pos);
        }
        Ok(removed)
    }

    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.tracks.move_item(from, to)
    }

    pub fn reverse(&mut self) {
        self.tracks.reverse();
    }

    pub fn get(&self, index: usize) -> Result<&TrackRef> {
        self.tracks.get(index)
    }

    pub fn snapshot(&self) -> Vec<TrackRef> {
        self.tracks.snapshot()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRef> {
        self.tracks.iter()
    }

    /// Empty the playlist and drop every pin.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.pins.clear();
    }

    /// Replace the contents wholesale. Pins are dropped.
    pub fn replace_all(&mut self, tracks: impl IntoIterator<Item = TrackRef>) {
        self.clear();
        self.tracks.extend(tracks);
    }

    /// Sort a snapshot by `key` and write it back. Pins are dropped since the
    /// positions they describe no longer mean anything.
    pub fn sort_by(&mut self, key: SortKey) {
        let mut snapshot = self.snapshot();
        sort_tracks(&mut snapshot, key);
        self.replace_all(snapshot);
    }

    /// Pin whatever track currently sits at `index` to that position.
    pub fn pin_at(&mut self, index: usize) -> Result<()> {
        let track = self.tracks.get(index)?.clone();
        log::debug!("Pinned '{}' at position {}", track.title(), index);
        self.pins.insert(index, track);
        Ok(())
    }

    pub fn unpin(&mut self, index: usize) -> Option<TrackRef> {
        self.pins.remove(&index)
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.pins.contains_key(&index)
    }

    pub fn pins(&self) -> impl Iterator<Item = (usize, &TrackRef)> {
        self.pins.iter().map(|(&pos, track)| (pos, track))
    }

    /// Positions whose pinned track is not the one currently there, including
    /// pins past the end of the playlist.
    pub fn stale_pins(&self) -> Vec<usize> {
        self.pins
            .iter()
            .filter(|(pos, pinned)| match self.tracks.get(**pos) {
                Ok(current) => current.id() != pinned.id(),
                Err(_) => true,
            })
            .map(|(&pos, _)| pos)
            .collect()
    }

    /// Shuffle unpinned positions uniformly; pinned positions receive their
    /// pinned track. Pins beyond the current length are skipped this time
    /// but kept.
    pub fn shuffle_keeping_pinned(&mut self) {
        let current = self.tracks.snapshot();
        let mut pool: Vec<TrackRef> = current
            .iter()
            .enumerate()
            .filter(|(pos, _)| !self.pins.contains_key(pos))
            .map(|(_, track)| track.clone())
            .collect();
        pool.shuffle(&mut *self.rng);

        log::debug!(
            "Shuffling {} tracks, {} pinned",
            current.len(),
            current.len() - pool.len()
        );

        let mut pool = pool.into_iter();
        let mut rebuilt = OrderedSequence::new();
        for pos in 0..current.len() {
            match self.pins.get(&pos) {
                Some(pinned) => rebuilt.push_back(pinned.clone()),
                None => {
                    if let Some(track) = pool.next() {
                        rebuilt.push_back(track);
                    }
                }
            }
        }
        self.tracks = rebuilt;
    }

    /// Count, total duration and distinct artists in one pass.
    pub fn summary(&self) -> PlaylistSummary {
        let mut total_duration_ms = 0u64;
        let mut artists = HashSet::new();
        for track in &self.tracks {
            total_duration_ms += track.duration_ms();
            artists.insert(track.artist());
        }
        PlaylistSummary {
            track_count: self.tracks.len(),
            total_duration_ms,
            total_minutes: total_duration_ms as f64 / MS_PER_MINUTE,
            distinct_artists: artists.len(),
        }
    }

    pub fn entries(&self) -> Vec<PlaylistEntry> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(position, track)| PlaylistEntry {
                position,
                track: track.clone(),
                pinned: self.pins.contains_key(&position),
            })
            .collect()
    }

    /// Drop every occurrence of `track_id` and any pin naming it. Returns how
    /// many playlist entries were removed.
    pub fn remove_track_everywhere(&mut self, track_id: &str) -> usize {
        self.pins.retain(|_, t| t.id() != track_id);
        self.tracks.retain(|t| t.id() != track_id)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id() == track_id)
    }
}
