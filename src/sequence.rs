//! Doubly linked list backed by an arena of slots.
//!
//! Nodes refer to each other by slot index instead of by pointer. Removed
//! slots go on a free list and are reused by later insertions, so the arena
//! only grows to the high-water mark of the sequence length.
//!
//! Indexed operations walk from whichever end is closer to the target, which
//! bounds them at `min(i, len - i)` steps.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("index {index} out of range for sequence of length {len}")]
    OutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, SequenceError>;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct OrderedSequence<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for OrderedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedSequence<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append at the tail. O(1).
    pub fn push_back(&mut self, value: T) {
        let handle = self.alloc(value);
        self.link_back(handle);
    }

    /// Prepend at the head. O(1).
    pub fn push_front(&mut self, value: T) {
        let handle = self.alloc(value);
        self.link_front(handle);
    }

    /// Insert so that `value` ends up at `index`. Valid for `0..=len`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.len {
            return Err(self.out_of_range(index));
        }
        if index == self.len {
            self.push_back(value);
            return Ok(());
        }
        let at = self.handle_at(index)?;
        let handle = self.alloc(value);
        self.link_before(handle, at);
        Ok(())
    }

    /// Remove and return the value at `index`. Valid for `0..len`.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        let handle = self.handle_at(index)?;
        self.unlink(handle);
        Ok(self.release(handle))
    }

    /// Move the value at `from` so that it lands at `to`.
    ///
    /// Both indices must be below the current length. The node is detached
    /// first and `to` is then read against the shortened sequence, so
    /// `to == len - 1` always lands on the tail. The node is relinked in
    /// place, never reallocated.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.len {
            return Err(self.out_of_range(from));
        }
        if to >= self.len {
            return Err(self.out_of_range(to));
        }
        if from == to {
            return Ok(());
        }

        let handle = self.handle_at(from)?;
        self.unlink(handle);

        if to == self.len {
            self.link_back(handle);
        } else {
            match self.handle_at(to) {
                Ok(at) => self.link_before(handle, at),
                Err(e) => {
                    // Put the node back where it came from before reporting.
                    self.relink_at(handle, from);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Reverse in place by swapping every node's links, then head and tail.
    pub fn reverse(&mut self) {
        let mut current = self.head;
        while let Some(handle) = current {
            let node = self.node_mut(handle);
            std::mem::swap(&mut node.prev, &mut node.next);
            // After the swap `prev` holds the old `next`.
            current = node.prev;
        }
        std::mem::swap(&mut self.head, &mut self.tail);
    }

    pub fn get(&self, index: usize) -> Result<&T> {
        let handle = self.handle_at(index)?;
        Ok(&self.node(handle).value)
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|h| &self.node(h).value)
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.map(|h| &self.node(h).value)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Drop every value for which `keep` returns false. Returns how many were
    /// removed. Relative order of the survivors is unchanged.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) -> usize {
        let mut removed = 0;
        let mut current = self.head;
        while let Some(handle) = current {
            current = self.node(handle).next;
            if !keep(&self.node(handle).value) {
                self.unlink(handle);
                self.release(handle);
                removed += 1;
            }
        }
        removed
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            seq: self,
            next: self.head,
            remaining: self.len,
        }
    }

    fn out_of_range(&self, index: usize) -> SequenceError {
        SequenceError::OutOfRange {
            index,
            len: self.len,
        }
    }

    fn node(&self, handle: usize) -> &Node<T> {
        match self.slots.get(handle) {
            Some(Some(node)) => node,
            _ => unreachable!("sequence handle {handle} does not point at a live node"),
        }
    }

    fn node_mut(&mut self, handle: usize) -> &mut Node<T> {
        match self.slots.get_mut(handle) {
            Some(Some(node)) => node,
            _ => unreachable!("sequence handle {handle} does not point at a live node"),
        }
    }

    fn alloc(&mut self, value: T) -> usize {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(node);
                handle
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Free a detached node's slot and hand back its value.
    fn release(&mut self, handle: usize) -> T {
        match self.slots[handle].take() {
            Some(node) => {
                self.free.push(handle);
                node.value
            }
            None => unreachable!("sequence handle {handle} released twice"),
        }
    }

    /// Locate the node at `index`, walking from the nearer end.
    fn handle_at(&self, index: usize) -> Result<usize> {
        if index >= self.len {
            return Err(self.out_of_range(index));
        }
        let found = if index < self.len / 2 {
            let mut current = self.head;
            for _ in 0..index {
                current = current.and_then(|h| self.node(h).next);
            }
            current
        } else {
            let mut current = self.tail;
            for _ in index + 1..self.len {
                current = current.and_then(|h| self.node(h).prev);
            }
            current
        };
        found.ok_or_else(|| self.out_of_range(index))
    }

    fn link_back(&mut self, handle: usize) {
        let tail = self.tail;
        {
            let node = self.node_mut(handle);
            node.prev = tail;
            node.next = None;
        }
        match tail {
            Some(t) => self.node_mut(t).next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.len += 1;
    }

    fn link_front(&mut self, handle: usize) {
        let head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = None;
            node.next = head;
        }
        match head {
            Some(h) => self.node_mut(h).prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.head = Some(handle);
        self.len += 1;
    }

    /// Link a detached node immediately before the live node `at`.
    fn link_before(&mut self, handle: usize, at: usize) {
        let prev = self.node(at).prev;
        {
            let node = self.node_mut(handle);
            node.prev = prev;
            node.next = Some(at);
        }
        self.node_mut(at).prev = Some(handle);
        match prev {
            Some(p) => self.node_mut(p).next = Some(handle),
            None => self.head = Some(handle),
        }
        self.len += 1;
    }

    /// Link a detached node so that it sits at `index` (`0..=len`).
    fn relink_at(&mut self, handle: usize, index: usize) {
        match self.handle_at(index) {
            Ok(at) => self.link_before(handle, at),
            Err(_) => self.link_back(handle),
        }
    }

    /// Detach a live node from its neighbours. The slot stays allocated.
    fn unlink(&mut self, handle: usize) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(handle);
        node.prev = None;
        node.next = None;
        self.len -= 1;
    }
}

impl<T: Clone> OrderedSequence<T> {
    /// Order-preserving copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// Front-to-back iterator over an `OrderedSequence`.
pub struct Iter<'a, T> {
    seq: &'a OrderedSequence<T>,
    next: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.next?;
        let node = self.seq.node(handle);
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a OrderedSequence<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Extend<T> for OrderedSequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for OrderedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut seq = Self::new();
        seq.extend(iter);
        seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Walk the links in both directions and check they agree with `len`.
    fn assert_links<T: std::fmt::Debug>(seq: &OrderedSequence<T>) {
        let mut forward = Vec::new();
        let mut prev = None;
        let mut current = seq.head;
        while let Some(h) = current {
            let node = seq.node(h);
            assert_eq!(node.prev, prev, "prev link of {h} is wrong");
            forward.push(h);
            prev = Some(h);
            current = node.next;
            assert!(forward.len() <= seq.len, "cycle in forward links");
        }
        assert_eq!(seq.tail, prev);
        assert_eq!(forward.len(), seq.len);

        let mut backward = Vec::new();
        let mut current = seq.tail;
        while let Some(h) = current {
            backward.push(h);
            current = seq.node(h).prev;
            assert!(backward.len() <= seq.len, "cycle in backward links");
        }
        backward.reverse();
        assert_eq!(forward, backward);

        let live = seq.slots.iter().filter(|s| s.is_some()).count();
        assert_eq!(live, seq.len);
    }

    fn letters(seq: &OrderedSequence<char>) -> String {
        seq.iter().collect()
    }

    fn seq_of(s: &str) -> OrderedSequence<char> {
        s.chars().collect()
    }

    #[test]
    fn test_push_both_ends() {
        let mut seq = OrderedSequence::new();
        seq.push_back('b');
        seq.push_back('c');
        seq.push_front('a');
        assert_eq!(letters(&seq), "abc");
        assert_eq!(seq.front(), Some(&'a'));
        assert_eq!(seq.back(), Some(&'c'));
        assert_links(&seq);
    }

    #[test]
    fn test_insert_positions() {
        let mut seq = seq_of("bd");
        seq.insert(0, 'a').unwrap();
        seq.insert(2, 'c').unwrap();
        seq.insert(4, 'e').unwrap();
        assert_eq!(letters(&seq), "abcde");
        assert_links(&seq);
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut seq = seq_of("ab");
        assert_eq!(
            seq.insert(3, 'x'),
            Err(SequenceError::OutOfRange { index: 3, len: 2 })
        );
        assert_eq!(letters(&seq), "ab");
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut seq = seq_of("abcde");
        assert_eq!(seq.remove(0), Ok('a'));
        assert_eq!(seq.remove(3), Ok('e'));
        assert_eq!(seq.remove(1), Ok('c'));
        assert_eq!(letters(&seq), "bd");
        assert_links(&seq);
        assert_eq!(seq.remove(0), Ok('b'));
        assert_eq!(seq.remove(0), Ok('d'));
        assert!(seq.is_empty());
        assert_eq!(seq.head, None);
        assert_eq!(seq.tail, None);
    }

    #[test]
    fn test_remove_and_get_out_of_range() {
        let mut seq = seq_of("abc");
        assert!(seq.remove(3).is_err());
        assert!(seq.get(3).is_err());
        let mut empty: OrderedSequence<char> = OrderedSequence::new();
        assert_eq!(
            empty.remove(0),
            Err(SequenceError::OutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_get_from_either_end() {
        let seq = seq_of("abcdefg");
        for (i, expected) in "abcdefg".chars().enumerate() {
            assert_eq!(seq.get(i), Ok(&expected));
        }
    }

    #[test]
    fn test_move_to_last_index_lands_at_end() {
        let mut seq = seq_of("abcd");
        seq.move_item(0, 3).unwrap();
        assert_eq!(letters(&seq), "bcda");
        assert_links(&seq);
    }

    #[test]
    fn test_move_to_front() {
        let mut seq = seq_of("abcd");
        seq.move_item(3, 0).unwrap();
        assert_eq!(letters(&seq), "dabc");
        assert_links(&seq);
    }

    #[test]
    fn test_move_uses_post_removal_index() {
        // Removing 'a' shifts b,c,d down; index 2 then refers to 'd'.
        let mut seq = seq_of("abcd");
        seq.move_item(0, 2).unwrap();
        assert_eq!(letters(&seq), "bcad");

        let mut seq = seq_of("abcd");
        seq.move_item(1, 2).unwrap();
        assert_eq!(letters(&seq), "acbd");
    }

    #[test]
    fn test_move_same_index_is_noop() {
        let mut seq = seq_of("abc");
        seq.move_item(1, 1).unwrap();
        assert_eq!(letters(&seq), "abc");
    }

    #[test]
    fn test_move_out_of_range_leaves_sequence_intact() {
        let mut seq = seq_of("abc");
        assert_eq!(
            seq.move_item(0, 3),
            Err(SequenceError::OutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            seq.move_item(5, 0),
            Err(SequenceError::OutOfRange { index: 5, len: 3 })
        );
        assert_eq!(letters(&seq), "abc");
        assert_links(&seq);
    }

    #[test]
    fn test_move_there_and_back_restores_order() {
        let original = "abcdef";
        for i in 0..original.len() {
            for j in 0..original.len() {
                let mut seq = seq_of(original);
                seq.move_item(i, j).unwrap();
                seq.move_item(j, i).unwrap();
                assert_eq!(letters(&seq), original, "move({i},{j}) then back");
                assert_links(&seq);
            }
        }
    }

    #[test]
    fn test_move_reuses_node() {
        let mut seq = seq_of("abcd");
        let slots_before = seq.slots.len();
        seq.move_item(0, 3).unwrap();
        seq.move_item(2, 1).unwrap();
        assert_eq!(seq.slots.len(), slots_before);
        assert!(seq.free.is_empty());
    }

    #[test]
    fn test_reverse_is_an_involution() {
        let source = "abcdefgh";
        for n in 0..=source.len() {
            let mut seq = seq_of(&source[..n]);
            seq.reverse();
            let reversed: String = source[..n].chars().rev().collect();
            assert_eq!(letters(&seq), reversed);
            assert_links(&seq);
            seq.reverse();
            assert_eq!(letters(&seq), &source[..n]);
            assert_links(&seq);
        }
    }

    #[test]
    fn test_indexed_ops_after_reverse() {
        let mut seq = seq_of("abcde");
        seq.reverse();
        assert_eq!(seq.get(1), Ok(&'d'));
        seq.insert(1, 'x').unwrap();
        assert_eq!(seq.remove(4), Ok('b'));
        assert_eq!(letters(&seq), "exdca");
        assert_links(&seq);
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut seq = seq_of("abc");
        seq.remove(1).unwrap();
        seq.push_back('d');
        assert_eq!(seq.slots.len(), 3);
        assert_eq!(letters(&seq), "acd");
        assert_links(&seq);
    }

    #[test]
    fn test_retain() {
        let mut seq = seq_of("abcabc");
        let removed = seq.retain(|c| *c != 'b');
        assert_eq!(removed, 2);
        assert_eq!(letters(&seq), "acac");
        assert_links(&seq);

        assert_eq!(seq.retain(|_| false), 4);
        assert!(seq.is_empty());
        assert_links(&seq);
    }

    #[test]
    fn test_clear_and_snapshot() {
        let mut seq = seq_of("xyz");
        assert_eq!(seq.snapshot(), vec!['x', 'y', 'z']);
        assert_eq!(seq.iter().len(), 3);
        seq.clear();
        assert!(seq.snapshot().is_empty());
        seq.push_front('q');
        assert_eq!(letters(&seq), "q");
    }

    #[test]
    fn test_random_operations_match_vec_model() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seq = OrderedSequence::new();
        let mut model: Vec<u32> = Vec::new();
        let mut inserts = 0usize;
        let mut deletes = 0usize;

        for step in 0..2000u32 {
            match rng.random_range(0..6) {
                0 => {
                    seq.push_back(step);
                    model.push(step);
                    inserts += 1;
                }
                1 => {
                    seq.push_front(step);
                    model.insert(0, step);
                    inserts += 1;
                }
                2 => {
                    let i = rng.random_range(0..=model.len() + 1);
                    let result = seq.insert(i, step);
                    if i <= model.len() {
                        assert!(result.is_ok());
                        model.insert(i, step);
                        inserts += 1;
                    } else {
                        assert!(result.is_err());
                    }
                }
                3 => {
                    let i = rng.random_range(0..=model.len());
                    let result = seq.remove(i);
                    if i < model.len() {
                        assert_eq!(result, Ok(model.remove(i)));
                        deletes += 1;
                    } else {
                        assert!(result.is_err());
                    }
                }
                4 if !model.is_empty() => {
                    let from = rng.random_range(0..model.len());
                    let to = rng.random_range(0..model.len());
                    seq.move_item(from, to).unwrap();
                    let value = model.remove(from);
                    model.insert(to, value);
                }
                _ => {
                    seq.reverse();
                    model.reverse();
                }
            }
            assert_eq!(seq.len(), inserts - deletes);
        }

        assert_eq!(seq.snapshot(), model);
        assert_eq!(seq.snapshot().len(), seq.len());
        assert_links(&seq);
    }
}
