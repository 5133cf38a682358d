//! Query routing for ragroute.
//!
//! [`RetrievalRouter::route`] classifies a question, runs the chosen
//! strategy against the document store and knowledge source, and asks the
//! language model for an answer grounded in whatever context was found.

pub mod bootstrap;
pub mod prompts;
pub mod router;
pub mod stats;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use bootstrap::Runtime;
pub use router::{DEGRADED_MARKER, RetrievalRouter, RouteOutcome, RouterConfig, SourceRef};
pub use stats::{StatsSnapshot, UsageStats};
