use super::error::EngineError;
use crate::core::models::labeling::Labeling;
use crate::core::models::species::SpeciesCounts;

/// Highest number of distinct dopant species a run may place.
pub const MAX_DOPANT_SPECIES: usize = 3;

/// Checks that `counts` can be placed on an `n_sites` sublattice.
pub fn validate(n_sites: usize, counts: &SpeciesCounts) -> Result<(), EngineError> {
    let total = counts.total();
    if total != n_sites {
        return Err(EngineError::Configuration {
            sites: n_sites,
            total,
        });
    }
    let arity = counts.dopant_arity();
    if arity > MAX_DOPANT_SPECIES {
        return Err(EngineError::UnsupportedArity {
            arity,
            max: MAX_DOPANT_SPECIES,
        });
    }
    Ok(())
}

/// Lazily yields every distinct labeling with the given ordinal counts, exactly once each,
/// in ascending lexicographic order.
///
/// Starts from the sorted multiset and steps with the classic next-permutation rule, which
/// never revisits an arrangement of equal labels. Memory is a single labeling buffer.
#[derive(Debug, Clone)]
pub struct LabelingEnumerator {
    current: Vec<u8>,
    exhausted: bool,
    emitted: u64,
}

impl LabelingEnumerator {
    pub fn new(n_sites: usize, counts: &SpeciesCounts) -> Result<Self, EngineError> {
        validate(n_sites, counts)?;
        let current = counts
            .ordinal_counts()
            .into_iter()
            .enumerate()
            .flat_map(|(ordinal, count)| std::iter::repeat_n(ordinal as u8, count))
            .collect();
        Ok(Self {
            current,
            exhausted: false,
            emitted: 0,
        })
    }

    /// Number of labelings yielded so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn advance(&mut self) -> bool {
        let labels = &mut self.current;
        let n = labels.len();
        if n < 2 {
            return false;
        }
        let Some(pivot) = (0..n - 1).rev().find(|&i| labels[i] < labels[i + 1]) else {
            return false;
        };
        // A successor exists because labels[pivot + 1] > labels[pivot].
        let successor = (pivot + 1..n)
            .rev()
            .find(|&j| labels[j] > labels[pivot])
            .unwrap_or(pivot + 1);
        labels.swap(pivot, successor);
        labels[pivot + 1..].reverse();
        true
    }
}

impl Iterator for LabelingEnumerator {
    type Item = Labeling;

    fn next(&mut self) -> Option<Labeling> {
        if self.exhausted {
            return None;
        }
        let labeling = Labeling::new(self.current.clone());
        self.exhausted = !self.advance();
        self.emitted += 1;
        Some(labeling)
    }
}

impl std::iter::FusedIterator for LabelingEnumerator {}
