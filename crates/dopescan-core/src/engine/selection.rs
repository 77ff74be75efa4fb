use super::governor::RawCount;
use super::state::{Candidate, Evaluation};
use crate::core::scoring::ScoringError;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A successfully scored candidate, ordered by `(score, id)`.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate {
    pub candidate_id: usize,
    pub score: f64,
    pub wall_time: Duration,
}

impl PartialEq for ScoredCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ScoredCandidate {}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        signless_zero(self.score)
            .total_cmp(&signless_zero(other.score))
            .then_with(|| self.candidate_id.cmp(&other.candidate_id))
    }
}

/// Maps `-0.0` to `0.0` so that equal scores fall through to the id tie-break.
fn signless_zero(score: f64) -> f64 {
    if score == 0.0 { 0.0 } else { score }
}

/// The `k` smallest entries in ascending `(score, id)` order; all of them when fewer than `k`.
///
/// Keeps a max-heap of at most `k` entries, so memory stays bounded by `k`.
pub fn select_top_k<I>(scored: I, k: usize) -> Vec<ScoredCandidate>
where
    I: IntoIterator<Item = ScoredCandidate>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for entry in scored {
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(worst) = heap.peek() {
            if entry < *worst {
                heap.pop();
                heap.push(entry);
            }
        }
    }
    heap.into_sorted_vec()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub candidate: Candidate,
    pub score: f64,
    pub wall_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringFailure {
    pub candidate_id: usize,
    pub signature: String,
    pub error: ScoringError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningStats {
    pub sites: usize,
    pub group_order: usize,
    pub raw_count: RawCount,
    /// Labelings produced by the enumerator.
    pub raw_checked: u64,
    /// Symmetry-distinct configurations found.
    pub unique: usize,
    pub evaluated: usize,
    pub failed: usize,
    pub evaluation_time: Duration,
}

/// Outcome of a screening run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub ranked: Vec<RankedCandidate>,
    /// Candidates whose scoring failed, in id order.
    pub failures: Vec<ScoringFailure>,
    pub stats: ScreeningStats,
}

/// Splits evaluations into the ranked top `k` and the failures.
///
/// `candidates` must be indexed by id, which is how the canonicalizer emits them.
pub fn rank(
    candidates: Vec<Candidate>,
    evaluations: &[Evaluation],
    k: usize,
) -> (Vec<RankedCandidate>, Vec<ScoringFailure>) {
    let mut failures = Vec::new();
    let mut scored = Vec::with_capacity(evaluations.len());
    for evaluation in evaluations {
        match &evaluation.outcome {
            Ok(score) => scored.push(ScoredCandidate {
                candidate_id: evaluation.candidate_id,
                score: *score,
                wall_time: evaluation.wall_time,
            }),
            Err(error) => failures.push(ScoringFailure {
                candidate_id: evaluation.candidate_id,
                signature: candidates
                    .get(evaluation.candidate_id)
                    .map(Candidate::signature)
                    .unwrap_or_default(),
                error: error.clone(),
            }),
        }
    }

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    let ranked = select_top_k(scored, k)
        .into_iter()
        .filter_map(|entry| {
            let candidate = slots.get_mut(entry.candidate_id)?.take()?;
            Some((entry, candidate))
        })
        .enumerate()
        .map(|(idx, (entry, candidate))| RankedCandidate {
            rank: idx + 1,
            candidate,
            score: entry.score,
            wall_time: entry.wall_time,
        })
        .collect();

    (ranked, failures)
}
