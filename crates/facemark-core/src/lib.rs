//! facemark-core — Image normalization and whole-image similarity matching.
//!
//! Probes and references are reduced to a fixed-size RGBA fingerprint by a
//! cover-fit resample, then compared by mean absolute RGB difference. This is
//! a coarse pixel heuristic, not a face recognizer: pose, lighting and framing
//! all move the score.

pub mod input;
pub mod matcher;
pub mod normalizer;
pub mod types;

pub use input::{DecodeError, ImageSource};
pub use matcher::{best_match, distance, MatchError, Matcher, MeanAbsoluteDifference};
pub use normalizer::{normalize, CoverFit, DEFAULT_TARGET_SIZE};
pub use types::{AttendanceEntry, EncodeError, MatchCandidate, NormalizedImage, Reference};
