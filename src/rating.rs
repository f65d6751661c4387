//! Rating index: a binary search tree with one bucket node per rating value.
//!
//! Only five keys can ever exist, so the tree is at most five nodes deep.
//! Each node keeps its tracks in insertion order. A node is unlinked as soon
//! as its bucket empties.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::track::{MAX_RATING, MIN_RATING, TrackRef, is_valid_rating};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating {0} is outside 1..=5")]
    InvalidRating(u8),
}

#[derive(Debug)]
struct BucketNode {
    rating: u8,
    tracks: Vec<TrackRef>,
    left: Option<Box<BucketNode>>,
    right: Option<Box<BucketNode>>,
}

impl BucketNode {
    fn new(rating: u8, track: TrackRef) -> Box<Self> {
        Box::new(Self {
            rating,
            tracks: vec![track],
            left: None,
            right: None,
        })
    }
}

#[derive(Debug, Default)]
pub struct RatingIndex {
    root: Option<Box<BucketNode>>,
}

impl RatingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `track` to the bucket for `rating` and stamp the rating onto it.
    pub fn insert(&mut self, track: TrackRef, rating: u8) -> Result<(), RatingError> {
        if !is_valid_rating(rating) {
            log::warn!(
                "Rejected rating {} for '{}': must be {}..={}",
                rating,
                track.title(),
                MIN_RATING,
                MAX_RATING
            );
            return Err(RatingError::InvalidRating(rating));
        }
        track.set_rating(rating);
        self.root = Some(insert_into(self.root.take(), track, rating));
        Ok(())
    }

    /// Tracks with `rating`, in insertion order. Empty for unknown or
    /// out-of-range ratings.
    pub fn search(&self, rating: u8) -> Vec<TrackRef> {
        if !is_valid_rating(rating) {
            log::warn!("Rating {} is outside {}..={}", rating, MIN_RATING, MAX_RATING);
            return Vec::new();
        }
        find_bucket(&self.root, rating)
            .map(|node| node.tracks.clone())
            .unwrap_or_default()
    }

    /// Remove the track with `track_id` from whichever bucket holds it.
    ///
    /// Buckets are not keyed by id, so this walks the tree: each node's
    /// bucket first, then its left subtree, then its right. Returns whether a
    /// track was removed.
    pub fn remove(&mut self, track_id: &str) -> bool {
        remove_track(&mut self.root, track_id)
    }

    /// Number of tracks per rating, ascending by rating.
    pub fn counts_by_rating(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        in_order(&self.root, &mut |node| {
            *counts.entry(node.rating).or_insert(0) += node.tracks.len();
        });
        counts
    }

    /// Total number of tracks across all buckets.
    pub fn len(&self) -> usize {
        let mut total = 0;
        in_order(&self.root, &mut |node| total += node.tracks.len());
        total
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn bucket_count(&self) -> usize {
        let mut count = 0;
        in_order(&self.root, &mut |_| count += 1);
        count
    }

    /// Ratings that currently have a bucket, ascending.
    pub fn ratings(&self) -> Vec<u8> {
        let mut ratings = Vec::new();
        in_order(&self.root, &mut |node| ratings.push(node.rating));
        ratings
    }

    pub fn depth(&self) -> usize {
        depth(&self.root)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.rating_of(track_id).is_some()
    }

    /// Rating of the bucket holding `track_id`, if any.
    pub fn rating_of(&self, track_id: &str) -> Option<u8> {
        let mut found = None;
        in_order(&self.root, &mut |node| {
            if found.is_none() && node.tracks.iter().any(|t| t.id() == track_id) {
                found = Some(node.rating);
            }
        });
        found
    }

    /// Every `(bucket rating, track)` pair, ascending by rating.
    pub fn entries(&self) -> Vec<(u8, TrackRef)> {
        let mut entries = Vec::new();
        in_order(&self.root, &mut |node| {
            entries.extend(node.tracks.iter().map(|t| (node.rating, t.clone())));
        });
        entries
    }

    pub fn clear(&mut self) {
        self.root = None;
    }
}

fn insert_into(node: Option<Box<BucketNode>>, track: TrackRef, rating: u8) -> Box<BucketNode> {
    let Some(mut node) = node else {
        log::debug!("Created bucket for rating {}", rating);
        return BucketNode::new(rating, track);
    };
    if rating < node.rating {
        node.left = Some(insert_into(node.left.take(), track, rating));
    } else if rating > node.rating {
        node.right = Some(insert_into(node.right.take(), track, rating));
    } else {
        node.tracks.push(track);
    }
    node
}

fn find_bucket(node: &Option<Box<BucketNode>>, rating: u8) -> Option<&BucketNode> {
    let node = node.as_deref()?;
    if rating < node.rating {
        find_bucket(&node.left, rating)
    } else if rating > node.rating {
        find_bucket(&node.right, rating)
    } else {
        Some(node)
    }
}

fn remove_track(slot: &mut Option<Box<BucketNode>>, track_id: &str) -> bool {
    let Some(node) = slot.as_mut() else {
        return false;
    };

    if let Some(pos) = node.tracks.iter().position(|t| t.id() == track_id) {
        node.tracks.remove(pos);
        if node.tracks.is_empty() {
            log::debug!("Bucket for rating {} emptied, removing node", node.rating);
            if let Some(emptied) = slot.take() {
                *slot = remove_node(emptied);
            }
        }
        return true;
    }

    remove_track(&mut node.left, track_id) || remove_track(&mut node.right, track_id)
}

/// Delete the node with key `rating` from the subtree, returning the new root.
fn remove_rating(node: Option<Box<BucketNode>>, rating: u8) -> Option<Box<BucketNode>> {
    let mut node = node?;
    if rating < node.rating {
        node.left = remove_rating(node.left.take(), rating);
        Some(node)
    } else if rating > node.rating {
        node.right = remove_rating(node.right.take(), rating);
        Some(node)
    } else {
        remove_node(node)
    }
}

/// Standard BST node deletion. A node with two children takes over its
/// in-order successor's rating and bucket, then the successor node is
/// deleted from the right subtree.
fn remove_node(mut node: Box<BucketNode>) -> Option<Box<BucketNode>> {
    match (node.left.take(), node.right.take()) {
        (None, None) => None,
        (Some(left), None) => Some(left),
        (None, Some(right)) => Some(right),
        (Some(left), Some(mut right)) => {
            let successor_rating = min_rating(&right);
            node.rating = successor_rating;
            node.tracks = take_min_bucket(&mut right);
            node.left = Some(left);
            node.right = remove_rating(Some(right), successor_rating);
            Some(node)
        }
    }
}

fn min_rating(node: &BucketNode) -> u8 {
    node.left.as_deref().map_or(node.rating, min_rating)
}

/// Move the bucket out of the leftmost node, leaving it empty for deletion.
fn take_min_bucket(node: &mut BucketNode) -> Vec<TrackRef> {
    match node.left.as_deref_mut() {
        Some(left) => take_min_bucket(left),
        None => std::mem::take(&mut node.tracks),
    }
}

fn in_order<'a, F: FnMut(&'a BucketNode)>(node: &'a Option<Box<BucketNode>>, visit: &mut F) {
    if let Some(node) = node {
        in_order(&node.left, visit);
        visit(node);
        in_order(&node.right, visit);
    }
}

fn depth(node: &Option<Box<BucketNode>>) -> usize {
    match node {
        Some(node) => 1 + depth(&node.left).max(depth(&node.right)),
        None => 0,
    }
}
