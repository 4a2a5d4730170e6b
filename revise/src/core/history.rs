//! Ordered version history with a cursor and branch-on-edit appends.
//!
//! The cursor is `None` exactly when the history is empty; otherwise it points
//! at a valid index. Appending always lands immediately after the cursor and
//! discards anything that was ahead of it.

use thiserror::Error;

use crate::core::label::{LabelPolicy, next_label};
use crate::core::types::{Direction, Version, VersionPatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// An operation needed a selected version but the history is empty.
    #[error("no version selected (history has {len} entries)")]
    OutOfRange { len: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    versions: Vec<Version>,
    cursor: Option<usize>,
    /// Versions appended over the session, including ones later truncated.
    issued: u64,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn get(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    /// Version under the cursor, if any.
    pub fn current(&self) -> Option<&Version> {
        self.cursor.and_then(|index| self.versions.get(index))
    }

    /// Label the next append would carry under `policy`.
    pub fn next_label(&self, policy: LabelPolicy) -> String {
        next_label(policy, self.versions.len(), self.issued)
    }

    /// Append after the cursor, discarding any versions ahead of it.
    ///
    /// Returns the new cursor, which always points at the appended version.
    pub fn append(&mut self, entry: Version) -> usize {
        self.append_after(self.cursor, entry)
    }

    /// Append after `anchor`, discarding any versions ahead of it.
    ///
    /// `None` replaces the whole history with `entry`. An anchor past the end
    /// keeps every existing version.
    pub fn append_after(&mut self, anchor: Option<usize>, entry: Version) -> usize {
        match anchor {
            None => self.versions.clear(),
            Some(index) => self.versions.truncate(index + 1),
        }
        self.versions.push(entry);
        self.issued += 1;
        let cursor = self.versions.len() - 1;
        self.cursor = Some(cursor);
        cursor
    }

    /// Replace the version under the cursor with a shallow-merged copy.
    pub fn update_current(&mut self, patch: &VersionPatch) -> Result<&Version, HistoryError> {
        let len = self.versions.len();
        let slot = self
            .cursor
            .and_then(|index| self.versions.get_mut(index))
            .ok_or(HistoryError::OutOfRange { len })?;
        *slot = slot.merged(patch);
        Ok(&*slot)
    }

    /// Move the cursor one step; a move past either end is a no-op returning `None`.
    pub fn navigate(&mut self, direction: Direction) -> Option<&Version> {
        let cursor = self.cursor?;
        let target = match direction {
            Direction::Previous => cursor.checked_sub(1)?,
            Direction::Next => cursor + 1,
        };
        if target >= self.versions.len() {
            return None;
        }
        self.cursor = Some(target);
        self.versions.get(target)
    }
}
