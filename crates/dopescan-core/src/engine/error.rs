use super::config::ConfigError;
use super::governor::RawCount;
use crate::core::symmetry::group::SymmetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "Species counts are inconsistent with the sublattice: counts sum to {total}, but the sublattice has {sites} sites"
    )]
    Configuration { sites: usize, total: usize },

    #[error(
        "Unsupported arity: {arity} distinct dopant species requested, canonical enumeration supports at most {max}"
    )]
    UnsupportedArity { arity: usize, max: usize },

    #[error(
        "Too many raw configurations ({raw_count}) > max_enum ({max_enum}). Reduce dopant counts or the supercell, or increase max_enum carefully"
    )]
    EnumerationTooLarge { raw_count: RawCount, max_enum: u64 },

    #[error(
        "Unique (symmetry-distinct) configurations exceeded max_unique={max_unique} after {raw_checked} raw labelings ({unique_count} found). This composition is too large for full enumeration"
    )]
    TooManyUniqueConfigurations {
        unique_count: usize,
        max_unique: usize,
        raw_checked: u64,
    },

    #[error("Symmetry group error: {source}")]
    Symmetry {
        #[from]
        source: SymmetryError,
    },

    #[error("Invalid screening configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}
