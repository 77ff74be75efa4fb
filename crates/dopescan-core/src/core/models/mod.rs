//! Data structures describing what is placed where on the sublattice.
//!
//! - [`sublattice`] - The fixed, ordered set of substitutable sites
//! - [`species`] - Host/dopant counts and their ordinal label encoding
//! - [`labeling`] - Raw label sequences, canonical keys and decoded configurations
//! - [`composition`] - Conversion of requested doping percentages into integer counts

pub mod composition;
pub mod labeling;
pub mod species;
pub mod sublattice;
