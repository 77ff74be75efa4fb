//! # Engine Module
//!
//! The stages of a screening run, each in its own module:
//!
//! - **Enumeration** ([`enumeration`]) - Lazy, deterministic generation of every distinct
//!   placement of the species multiset over the sublattice
//! - **Safety Limits** ([`governor`]) - Exact raw-count estimation and the `max_enum` /
//!   `max_unique` ceilings
//! - **Canonicalization** ([`canonical`]) - Orbit-minimum keys and first-seen deduplication
//! - **Evaluation** ([`evaluator`]) - Batched scoring on a bounded worker pool with
//!   per-worker scorers and order-independent aggregation
//! - **Selection** ([`selection`]) - Top-k ranking with discovery-order tie-breaks and the
//!   result model
//! - **Configuration** ([`config`]), **State** ([`state`]), **Progress** ([`progress`]) and
//!   **Errors** ([`error`])
//!
//! Enumeration and canonicalization are single-threaded; scoring is the only parallel stage.

pub mod canonical;
pub mod config;
pub mod enumeration;
pub mod error;
pub mod evaluator;
pub mod governor;
pub mod progress;
pub mod selection;
pub mod state;
