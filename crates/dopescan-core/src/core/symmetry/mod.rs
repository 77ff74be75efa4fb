//! # Symmetry Module
//!
//! Symmetry enters the engine only as a finite group of permutations of sublattice positions.
//! Where those permutations come from is the business of a [`provider::SymmetryProvider`]:
//! synthetic groups (cyclic, dihedral, generated from explicit generators) for model lattices
//! and tests, or crystallographic operations mapped onto the sublattice sites.
//!
//! - [`group`] - `Permutation` and `PermutationGroup`, validated and frozen
//! - [`provider`] - The provider capability and its built-in implementations

pub mod group;
pub mod provider;
