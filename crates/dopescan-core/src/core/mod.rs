//! # Core Module
//!
//! Stateless building blocks of the screening engine.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Sublattice, species counts, labelings and decoded
//!   configurations
//! - **Symmetry** ([`symmetry`]) - Permutation groups acting on sublattice positions and the
//!   providers that build them
//! - **Scoring** ([`scoring`]) - The pluggable energy-model capability and a reference
//!   pair-interaction model
//!
//! Everything in this layer is constructed once per run and frozen afterwards; the engine only
//! ever reads it, which is what allows the parallel evaluator to share it across workers
//! without locking.

pub mod models;
pub mod scoring;
pub mod symmetry;
