//! # Workflows Module
//!
//! High-level entry points that run the engine stages end to end.
//!
//! - **Screening Workflow** ([`screen`]) - Enumerates the symmetry-distinct placements of a
//!   species multiset on a sublattice, scores them in parallel and returns the ranked top k
//!   together with the failures and run statistics.
//!
//! Each call is a blocking, self-contained run: nothing is cached between runs and every
//! structural error (inconsistent counts, unsupported arity, exceeded ceilings) is reported
//! before any scoring work starts.

pub mod screen;
