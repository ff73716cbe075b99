//! Match assessment - turns a (searchee, candidate) pair into a cached decision.
//!
//! For each pair the engine consults the decision cache and then either
//! returns the settled decision, flips a previous match whose torrent is now
//! owned, reuses a cached torrent, or runs the full pipeline:
//!
//! size filter → download link → fetch → exclusion check → file tree
//!
//! The outcome is written back to the decision cache exactly once per call.

mod engine;
mod key_lock;
mod policy;
mod types;

pub use engine::AssessmentEngine;
pub use policy::{plan, Plan};
pub use types::*;
