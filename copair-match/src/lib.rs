//! Compatibility scoring and assignment lifecycle for copair
//!
//! - `engine`: pure scoring, ranking and greedy candidate selection
//! - `lifecycle`: persistence of pairings through the coordinator's write
//!   path, with repair passes after every approval and dissociation

pub mod engine;
pub mod errors;
pub mod lifecycle;

pub use engine::{propose_pairings, score_pair, MatchProposal, BASE_SCORE, GRADE_BONUS, SUBJECT_BONUS};
pub use errors::{MatchError, Result};
pub use lifecycle::{AssignmentLifecycle, MatchRunReport};
