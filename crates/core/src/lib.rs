pub mod heuristics;
pub mod models;
pub mod router;
pub mod safety;

pub use heuristics::extract_flags;
pub use models::*;
pub use router::{policy_for_pipeline, RouterService};
pub use safety::{SafetyClassifier, SafetyLexicon};
