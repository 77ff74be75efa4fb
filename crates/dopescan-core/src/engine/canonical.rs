use crate::core::models::labeling::{CanonicalKey, Labeling};
use crate::core::symmetry::group::PermutationGroup;
use std::collections::HashSet;

/// Smallest image of `labeling` over every permutation in `group`.
///
/// Two labelings get the same key exactly when some group element maps one onto the other.
pub fn canonical_form(group: &PermutationGroup, labeling: &Labeling) -> CanonicalKey {
    let labels = labeling.as_slice();
    let mut best = labels.to_vec();
    let mut scratch = vec![0u8; labels.len()];
    for perm in group.iter() {
        for (slot, &src) in scratch.iter_mut().zip(perm.as_slice()) {
            *slot = labels[src];
        }
        if scratch < best {
            best.copy_from_slice(&scratch);
        }
    }
    CanonicalKey::new(Labeling::new(best))
}

/// First-seen deduplication of labelings by canonical key.
#[derive(Debug)]
pub struct Canonicalizer<'g> {
    group: &'g PermutationGroup,
    seen: HashSet<CanonicalKey>,
}

impl<'g> Canonicalizer<'g> {
    pub fn new(group: &'g PermutationGroup) -> Self {
        Self {
            group,
            seen: HashSet::new(),
        }
    }

    /// Returns `true` when `labeling` is the first member of its class seen so far.
    pub fn observe(&mut self, labeling: &Labeling) -> bool {
        self.seen.insert(canonical_form(self.group, labeling))
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }
}
