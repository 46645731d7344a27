//! Fractional position keys for drag-and-drop ordering.
//!
//! A position key is an `f64` that is only ever compared. Moving an item
//! assigns it a fresh key strictly between its new neighbours, so no other
//! sibling needs renumbering.
//!
//! # Precision
//!
//! Repeated insertion between the same two neighbours halves the gap every
//! time. After enough insertions the midpoint collapses onto a neighbour; keys
//! are never rebalanced.
//!
//! # Examples
//!
//! ```rust
//! use tasklane::position::compute_position;
//!
//! assert_eq!(compute_position(&[], 0), 1024.0);
//! assert_eq!(compute_position(&[1024.0, 2048.0], 0), 512.0);
//! assert_eq!(compute_position(&[1024.0, 2048.0], 1), 1536.0);
//! assert_eq!(compute_position(&[1024.0, 2048.0], 2), 3072.0);
//! ```

/// Key assigned to the first item of an empty list.
pub const BASE_POSITION: f64 = 1024.0;

/// Headroom left after the last key when appending.
pub const APPEND_GAP: f64 = 1024.0;

/// Computes the key for an item inserted at `target_index`.
///
/// `siblings` must already exclude the moved item and be sorted ascending.
/// An index past the end is treated as an append.
#[must_use]
pub fn compute_position(siblings: &[f64], target_index: usize) -> f64 {
    compute_position_by(siblings, target_index, |key| *key)
}

/// Like [`compute_position`], reading each sibling's key through `key_of`.
///
/// # Examples
///
/// ```rust
/// use tasklane::position::compute_position_by;
///
/// let siblings = [("a", 100.0), ("b", 300.0)];
/// assert_eq!(compute_position_by(&siblings, 1, |(_, key)| *key), 200.0);
/// ```
#[must_use]
pub fn compute_position_by<T, F>(siblings: &[T], target_index: usize, key_of: F) -> f64
where
    F: Fn(&T) -> f64,
{
    let Some(last) = siblings.last() else {
        return BASE_POSITION;
    };
    if target_index == 0 {
        return key_of(&siblings[0]) / 2.0;
    }
    if target_index >= siblings.len() {
        return key_of(last) + APPEND_GAP;
    }
    let before = key_of(&siblings[target_index - 1]);
    let after = key_of(&siblings[target_index]);
    before.midpoint(after)
}
