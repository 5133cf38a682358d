//! Query classification for ragroute.
//!
//! Maps a raw question to a [`Category`](ragroute_core::Category), a default
//! [`Strategy`](ragroute_core::Strategy), and a confidence. The pattern,
//! weight, and strategy tables live in [`patterns`] as plain data.

pub mod classifier;
pub mod patterns;

pub use classifier::{CategoryScore, QueryClassifier, classify};
pub use patterns::{PATTERN_TABLE, STRATEGY_TABLE, WEIGHTS, default_strategy};
