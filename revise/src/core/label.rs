//! Version label assignment.

use serde::{Deserialize, Serialize};

/// How version labels are issued for new appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// `len + 1` of the history before the append. Truncation followed by a new
    /// append re-issues labels that discarded versions once carried.
    #[default]
    Derived,
    /// Strictly increasing across the session, independent of truncation.
    Monotonic,
}

/// Compute the label for the next appended version.
///
/// `len` is the history length before the append (pre-truncation) and
/// `issued` the number of versions appended so far in the session.
pub fn next_label(policy: LabelPolicy, len: usize, issued: u64) -> String {
    match policy {
        LabelPolicy::Derived => (len + 1).to_string(),
        LabelPolicy::Monotonic => (issued + 1).to_string(),
    }
}
