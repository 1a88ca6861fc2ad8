//! Parameter extraction: regex recognition of clinical parameters in
//! report text, unit normalization, range classification, dedup.

pub mod extractor;
pub mod names;
pub mod ranges;
pub mod registry;
pub mod tables;
pub mod units;

pub use extractor::ParameterExtractor;
pub use names::DisplayNames;
pub use ranges::{classify, ReferenceRange, ReferenceRanges};
pub use registry::{ParameterPattern, ParameterRegistry, PatternDefinition};
pub use tables::{ExtractionTables, TablesDefinition};
pub use units::UnitAliases;

/// Errors building extraction tables. Always surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Pattern '{id}' does not compile: {reason}")]
    InvalidPattern { id: String, reason: String },

    #[error("Pattern '{0}' has no value capture group")]
    MissingValueGroup(String),

    #[error("Duplicate pattern id: {0}")]
    DuplicateId(String),

    #[error("Pattern id must not be empty")]
    EmptyId,

    #[error("Reference range for '{0}' is invalid")]
    InvalidRange(String),

    #[error("Failed to read tables {0}: {1}")]
    TablesLoad(String, String),

    #[error("Failed to parse tables: {0}")]
    TablesParse(String),
}
