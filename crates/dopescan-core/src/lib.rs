//! # dopescan Core Library
//!
//! Symmetry-unique enumeration and ranking of dopant configurations on a crystal sublattice.
//! Given a set of substitutable sites, the species counts to place on them and a group of
//! site permutations, the library enumerates every distinct placement, keeps one representative
//! per symmetry class, scores the representatives in parallel with a caller-supplied energy
//! model and returns the lowest-scoring few with a reproducible ranking.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Frozen data models (`Sublattice`, `SpeciesCounts`,
//!   `Labeling`, `Configuration`), permutation groups and symmetry providers, and the scoring
//!   capability traits.
//!
//! - **[`engine`]: The Logic Core.** The labeling enumerator, the canonicalizer, the safety
//!   governor guarding combinatorial explosion, the parallel evaluator and the top-k selector,
//!   together with configuration, error and progress types.
//!
//! - **[`workflows`]: The Public API.** The `screen` workflow ties the engine stages into a
//!   single blocking call.

pub mod core;
pub mod engine;
pub mod workflows;

pub use workflows::screen::{ScreeningProblem, enumerate_and_rank};
