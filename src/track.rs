use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::Serialize;

/// Lowest valid rating.
pub const MIN_RATING: u8 = 1;
/// Highest valid rating.
pub const MAX_RATING: u8 = 5;
/// Rating value of a track that has never been rated.
pub const UNRATED: u8 = 0;

/// Shared handle to a track. The same record is referenced from the playlist,
/// the rating index, the identity index and the playback history.
pub type TrackRef = Rc<Track>;

/// A single music track.
///
/// Everything except the rating is fixed at construction. Equality and hashing
/// use the id only.
#[derive(Debug, Serialize)]
pub struct Track {
    id: String,
    title: String,
    artist: String,
    duration_ms: u64,
    rating: Cell<u8>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            duration_ms,
            rating: Cell::new(UNRATED),
        }
    }

    /// Build a track and wrap it in a shared handle.
    pub fn shared(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
    ) -> TrackRef {
        Rc::new(Self::new(id, title, artist, duration_ms))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Current rating, `UNRATED` (0) if none was assigned.
    pub fn rating(&self) -> u8 {
        self.rating.get()
    }

    pub(crate) fn set_rating(&self, rating: u8) {
        self.rating.set(rating);
    }

    pub fn is_rated(&self) -> bool {
        is_valid_rating(self.rating())
    }

    /// Duration formatted as `m:ss`.
    pub fn duration_display(&self) -> String {
        let total_secs = self.duration_ms / 1000;
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} [{}]", self.title, self.artist, self.duration_display())?;
        if self.is_rated() {
            write!(f, " {}/{}", self.rating(), MAX_RATING)?;
        }
        write!(f, " ({})", self.id)
    }
}

/// One validated row handed over by ingestion. `rating` is `None` for
/// tracks that should stay unrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    pub rating: Option<u8>,
}

impl TrackRecord {
    /// Build the shared track. The rating is left unset; it is stamped on
    /// when the track enters a rating index.
    pub fn into_track(self) -> TrackRef {
        Track::shared(self.id, self.title, self.artist, self.duration_ms)
    }
}

/// True for ratings in `MIN_RATING..=MAX_RATING`.
pub fn is_valid_rating(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
