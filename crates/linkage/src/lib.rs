//! `labcanon-linkage`: Cross-catalog lab test entity resolution engine.
//!
//! Pure engine crate: receives pre-parsed catalogs, returns one canonical
//! catalog document. No CLI or IO dependencies.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod score;
pub mod specimen;
pub mod summary;

pub use config::LinkageConfig;
pub use engine::{run, run_at, LinkageInput};
pub use error::LinkageError;
pub use model::{CatalogDocument, LabTestRecord, TestKind};
pub use score::{MatchScore, Scorer, ScoringPolicy};
pub use specimen::SpecimenTag;
