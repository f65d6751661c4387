use std::collections::HashMap;

use crate::track::TrackRef;

/// Lookup by exact id or by case-insensitive title.
///
/// The id table holds every known track. The title table keeps only the first
/// track registered under each lowercased title; later tracks with the same
/// title are reachable by id only.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_id: HashMap<String, TrackRef>,
    by_title: HashMap<String, TrackRef>,
}

fn normalize_title(title: &str) -> String {
    title.to_lowercase()
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, track: TrackRef) {
        self.by_title
            .entry(normalize_title(track.title()))
            .or_insert_with(|| track.clone());
        self.by_id.insert(track.id().to_string(), track);
    }

    /// Remove by id. The title entry goes too, but only when it points at this
    /// same track.
    pub fn remove(&mut self, track_id: &str) -> Option<TrackRef> {
        let removed = self.by_id.remove(track_id)?;
        let title = normalize_title(removed.title());
        if self
            .by_title
            .get(&title)
            .is_some_and(|held| held.id() == track_id)
        {
            self.by_title.remove(&title);
        }
        Some(removed)
    }

    /// Exact id match first, then lowercase title.
    pub fn lookup(&self, query: &str) -> Option<TrackRef> {
        self.by_id
            .get(query)
            .or_else(|| self.by_title.get(&normalize_title(query)))
            .cloned()
    }

    pub fn get(&self, track_id: &str) -> Option<&TrackRef> {
        self.by_id.get(track_id)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.by_id.contains_key(track_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All known tracks, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackRef> {
        self.by_id.values()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_title.clear();
    }
}
