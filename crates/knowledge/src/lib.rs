//! External knowledge escalation for ragroute.
//!
//! The router escalates here when local retrieval is weak. [`Escalator`]
//! extracts search terms and asks a [`KnowledgeSource`](ragroute_core::KnowledgeSource);
//! [`WikipediaSource`] is the production source.

pub mod escalator;
pub mod terms;
pub mod wikipedia;

pub use escalator::{Escalator, MAX_TERMS};
pub use terms::extract_terms;
pub use wikipedia::WikipediaSource;
