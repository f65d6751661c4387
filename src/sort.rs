use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::track::{Track, TrackRef};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("unsupported sort key '{0}' (expected title, duration_asc or duration_desc)")]
    UnsupportedKey(String),
}

/// Ordering criterion for playlist sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Case-insensitive title, ascending.
    Title,
    DurationAsc,
    DurationDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Title, SortKey::DurationAsc, SortKey::DurationDesc];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::DurationAsc => "duration_asc",
            Self::DurationDesc => "duration_desc",
        }
    }

    pub fn compare(&self, a: &Track, b: &Track) -> Ordering {
        match self {
            Self::Title => compare_case_insensitive(a.title(), b.title()),
            Self::DurationAsc => a.duration_ms().cmp(&b.duration_ms()),
            Self::DurationDesc => b.duration_ms().cmp(&a.duration_ms()),
        }
    }
}

impl FromStr for SortKey {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "duration_asc" => Ok(Self::DurationAsc),
            "duration_desc" => Ok(Self::DurationDesc),
            _ => Err(SortError::UnsupportedKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Stable merge sort of `tracks` by `key`.
pub fn sort_tracks(tracks: &mut [TrackRef], key: SortKey) {
    merge_sort_by(tracks, &mut |a: &TrackRef, b: &TrackRef| key.compare(a, b));
}

/// Like `sort_tracks`, with the key given by name. An unknown name leaves
/// `tracks` untouched.
pub fn sort_tracks_by_name(tracks: &mut [TrackRef], key: &str) -> Result<SortKey, SortError> {
    let key: SortKey = key.parse()?;
    sort_tracks(tracks, key);
    Ok(key)
}

/// Top-down merge sort. Stable: on ties the element from the left run is
/// taken first. O(n log n) comparisons, O(n) scratch per merge level.
pub fn merge_sort_by<T, F>(items: &mut [T], compare: &mut F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return;
    }
    let mid = items.len() / 2;
    merge_sort_by(&mut items[..mid], compare);
    merge_sort_by(&mut items[mid..], compare);
    merge(items, mid, compare);
}

fn merge<T, F>(items: &mut [T], mid: usize, compare: &mut F)
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let left = items[..mid].to_vec();
    let right = items[mid..].to_vec();
    let (mut i, mut j) = (0, 0);

    for slot in items.iter_mut() {
        let take_left = j >= right.len()
            || (i < left.len() && compare(&left[i], &right[j]) != Ordering::Greater);
        if take_left {
            *slot = left[i].clone();
            i += 1;
        } else {
            *slot = right[j].clone();
            j += 1;
        }
    }
}
