use super::species::LabelMap;
use super::sublattice::Sublattice;
use std::fmt;
use std::sync::Arc;

/// One species ordinal per sublattice position.
///
/// Ordering is lexicographic over the ordinals, which is the total order the canonicalizer
/// minimizes over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Labeling(Vec<u8>);

impl Labeling {
    pub fn new(labels: Vec<u8>) -> Self {
        Self(labels)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Image of this labeling under a site permutation: `image[i] = self[perm[i]]`.
    pub fn permuted(&self, perm: &[usize]) -> Labeling {
        Labeling(perm.iter().map(|&src| self.0[src]).collect())
    }

    pub fn count(&self, ordinal: u8) -> usize {
        self.0.iter().filter(|&&l| l == ordinal).count()
    }
}

impl From<Vec<u8>> for Labeling {
    fn from(labels: Vec<u8>) -> Self {
        Self(labels)
    }
}

/// Representative of a symmetry-equivalence class: the smallest labeling in the orbit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey(Labeling);

impl CanonicalKey {
    pub(crate) fn new(labeling: Labeling) -> Self {
        Self(labeling)
    }

    pub fn as_labeling(&self) -> &Labeling {
        &self.0
    }
}

/// A labeling realized on the sublattice: species labels attached to parent site indices.
///
/// This is what the scorer receives. It shares the sublattice and label map with every other
/// configuration of the run, so cloning it only copies the labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    labeling: Labeling,
    parent_sites: Arc<[usize]>,
    label_map: Arc<LabelMap>,
}

/// One occupied sublattice position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteOccupation<'a> {
    pub position: usize,
    pub parent_index: usize,
    pub species: &'a str,
}

impl Configuration {
    pub(crate) fn new(
        labeling: Labeling,
        parent_sites: Arc<[usize]>,
        label_map: Arc<LabelMap>,
    ) -> Self {
        debug_assert_eq!(labeling.len(), parent_sites.len());
        Self {
            labeling,
            parent_sites,
            label_map,
        }
    }

    pub fn realize(labeling: Labeling, sublattice: &Sublattice, label_map: Arc<LabelMap>) -> Self {
        Self::new(labeling, sublattice.shared_sites(), label_map)
    }

    pub fn labeling(&self) -> &Labeling {
        &self.labeling
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }

    pub fn len(&self) -> usize {
        self.labeling.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labeling.is_empty()
    }

    pub fn species_at(&self, position: usize) -> Option<&str> {
        self.labeling
            .as_slice()
            .get(position)
            .and_then(|&ordinal| self.label_map.label(ordinal))
    }

    pub fn sites(&self) -> impl Iterator<Item = SiteOccupation<'_>> {
        self.labeling
            .as_slice()
            .iter()
            .zip(self.parent_sites.iter())
            .enumerate()
            .map(|(position, (&ordinal, &parent_index))| SiteOccupation {
                position,
                parent_index,
                species: self.label_map.label(ordinal).unwrap_or_default(),
            })
    }

    /// Human-readable placement summary, e.g. `Nb2_Sb5`, or `pristine` without dopants.
    pub fn signature(&self) -> String {
        let parts: Vec<String> = self
            .sites()
            .filter(|site| site.species != self.label_map.host())
            .map(|site| format!("{}{}", site.species, site.position))
            .collect();
        if parts.is_empty() {
            "pristine".to_string()
        } else {
            parts.join("_")
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
