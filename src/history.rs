use crate::track::TrackRef;

/// Playback history as a LIFO stack. The most recent play is on top.
#[derive(Debug, Default)]
pub struct PlaybackHistory {
    plays: Vec<TrackRef>,
}

impl PlaybackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: TrackRef) {
        self.plays.push(track);
    }

    pub fn pop(&mut self) -> Option<TrackRef> {
        self.plays.pop()
    }

    pub fn peek(&self) -> Option<&TrackRef> {
        self.plays.last()
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    /// Up to `count` most recent plays, newest first.
    pub fn recent(&self, count: usize) -> Vec<TrackRef> {
        self.plays.iter().rev().take(count).cloned().collect()
    }

    /// Forget every play of `track_id`. Returns how many entries went.
    pub fn purge(&mut self, track_id: &str) -> usize {
        let before = self.plays.len();
        self.plays.retain(|t| t.id() != track_id);
        before - self.plays.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRef> {
        self.plays.iter()
    }
}
