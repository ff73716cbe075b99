//! Fuzzy size pre-filter.

use crate::searchee::Searchee;

/// Acceptance window `[L·(1−t), L·(1+t)]` for a searchee of total length `L`.
pub fn size_window(total_length: u64, tolerance: f64) -> (f64, f64) {
    let total = total_length as f64;
    (total * (1.0 - tolerance), total * (1.0 + tolerance))
}

/// Whether `candidate_size` lies within `tolerance` of the searchee's
/// total length. Both bounds are inclusive.
pub fn size_matches(candidate_size: u64, searchee: &Searchee, tolerance: f64) -> bool {
    let (lower, upper) = size_window(searchee.total_length(), tolerance);
    let size = candidate_size as f64;
    lower <= size && size <= upper
}
