//! Cheap structural checks between a candidate and a searchee.

mod file_tree;
mod size_filter;

pub use file_tree::file_tree_matches;
pub use size_filter::{size_matches, size_window};
