use super::species::SpeciesCounts;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SublatticeError {
    #[error("Sublattice is empty: no substitutable sites were found")]
    Empty,
    #[error("Parent site index {0} appears more than once in the sublattice")]
    DuplicateSite(usize),
    #[error("Host '{host}' not found on the enumerated sublattice. Found: {found:?}")]
    HostNotFound {
        host: String,
        found: BTreeMap<String, usize>,
    },
}

/// The ordered, fixed set of substitutable sites.
///
/// Position `i` of every labeling refers to `parent_sites()[i]` in the caller's structure.
/// Positions are assigned once and never renumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sublattice {
    parent_sites: Arc<[usize]>,
}

impl Sublattice {
    pub fn new(parent_sites: Vec<usize>) -> Result<Self, SublatticeError> {
        if parent_sites.is_empty() {
            return Err(SublatticeError::Empty);
        }
        let mut seen = HashSet::with_capacity(parent_sites.len());
        for &site in &parent_sites {
            if !seen.insert(site) {
                return Err(SublatticeError::DuplicateSite(site));
            }
        }
        Ok(Self {
            parent_sites: parent_sites.into(),
        })
    }

    /// A sublattice whose positions coincide with parent indices `0..n`.
    pub fn contiguous(n: usize) -> Result<Self, SublatticeError> {
        Self::new((0..n).collect())
    }

    /// Derives the sublattice and its species counts from the species of every parent site.
    ///
    /// All sites whose species is not in `excluded` (typically the anions) are substitutable;
    /// the counts are read off the occupants of those sites.
    pub fn infer<S: AsRef<str>>(
        site_species: &[S],
        excluded: &[S],
        host: &str,
    ) -> Result<(Self, SpeciesCounts), SublatticeError> {
        let excluded: HashSet<&str> = excluded.iter().map(AsRef::as_ref).collect();
        let mut parent_sites = Vec::new();
        let mut found: BTreeMap<String, usize> = BTreeMap::new();

        for (idx, species) in site_species.iter().enumerate() {
            let species = species.as_ref();
            if excluded.contains(species) {
                continue;
            }
            parent_sites.push(idx);
            *found.entry(species.to_string()).or_insert(0) += 1;
        }

        if !found.contains_key(host) {
            return Err(SublatticeError::HostNotFound {
                host: host.to_string(),
                found,
            });
        }

        let sublattice = Self::new(parent_sites)?;
        let counts = SpeciesCounts::new(host, found);
        Ok((sublattice, counts))
    }

    pub fn len(&self) -> usize {
        self.parent_sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_sites.is_empty()
    }

    pub fn parent_sites(&self) -> &[usize] {
        &self.parent_sites
    }

    pub(crate) fn shared_sites(&self) -> Arc<[usize]> {
        Arc::clone(&self.parent_sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_and_duplicate_sites() {
        assert_eq!(Sublattice::new(vec![]), Err(SublatticeError::Empty));
        assert_eq!(
            Sublattice::new(vec![0, 3, 3]),
            Err(SublatticeError::DuplicateSite(3))
        );
    }

    #[test]
    fn contiguous_maps_positions_to_identical_parent_indices() {
        let sublattice = Sublattice::contiguous(4).unwrap();
        assert_eq!(sublattice.len(), 4);
        assert_eq!(sublattice.parent_sites(), &[0, 1, 2, 3]);
    }

    #[test]
    fn infer_skips_excluded_species_and_counts_occupants() {
        let sites = ["Ti", "O", "Nb", "O", "Ti", "Ti", "O", "Sb"];
        let (sublattice, counts) = Sublattice::infer(&sites, &["O"], "Ti").unwrap();

        assert_eq!(sublattice.parent_sites(), &[0, 2, 4, 5, 7]);
        assert_eq!(counts.host_count(), 3);
        assert_eq!(counts.dopant_count("Nb"), Some(1));
        assert_eq!(counts.dopant_count("Sb"), Some(1));
        assert_eq!(counts.total(), sublattice.len());
    }

    #[test]
    fn infer_fails_when_host_is_absent() {
        let sites = ["Nb", "O", "Sb"];
        let err = Sublattice::infer(&sites, &["O"], "Ti").unwrap_err();
        match err {
            SublatticeError::HostNotFound { host, found } => {
                assert_eq!(host, "Ti");
                assert_eq!(found.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
