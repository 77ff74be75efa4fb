use crate::core::models::labeling::Configuration;
use crate::core::models::species::SpeciesCounts;
use crate::core::models::sublattice::Sublattice;
use crate::core::scoring::ScorerFactory;
use crate::core::symmetry::group::{PermutationGroup, SymmetryError};
use crate::core::symmetry::provider::SymmetryProvider;
use crate::engine::canonical::Canonicalizer;
use crate::engine::config::ScreeningConfig;
use crate::engine::enumeration::{self, LabelingEnumerator};
use crate::engine::error::EngineError;
use crate::engine::evaluator;
use crate::engine::governor::{RawCount, SafetyGovernor, multinomial};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::selection::{self, RankedResult, ScreeningStats};
use crate::engine::state::{Candidate, Stage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

const CANONICALIZATION_PROGRESS_STRIDE: u64 = 4096;

/// The frozen inputs of a screening run.
#[derive(Debug, Clone)]
pub struct ScreeningProblem {
    pub sublattice: Sublattice,
    pub counts: SpeciesCounts,
    pub group: Arc<PermutationGroup>,
}

impl ScreeningProblem {
    pub fn new(
        sublattice: Sublattice,
        counts: SpeciesCounts,
        group: PermutationGroup,
    ) -> Result<Self, EngineError> {
        if group.degree() != sublattice.len() {
            return Err(SymmetryError::LengthMismatch {
                expected: sublattice.len(),
                found: group.degree(),
            }
            .into());
        }
        Ok(Self {
            sublattice,
            counts,
            group: Arc::new(group),
        })
    }

    pub fn from_provider<P>(
        sublattice: Sublattice,
        counts: SpeciesCounts,
        provider: &P,
    ) -> Result<Self, EngineError>
    where
        P: SymmetryProvider + ?Sized,
    {
        let group = provider.permutations(&sublattice)?;
        Self::new(sublattice, counts, group)
    }
}

/// Symmetry-distinct candidates in discovery order, with enumeration statistics.
#[derive(Debug, Clone)]
pub struct UniqueConfigurations {
    pub candidates: Vec<Candidate>,
    pub raw_count: RawCount,
    pub raw_checked: u64,
}

/// Runs a full screening: validation, enumeration, canonicalization, parallel scoring and
/// top-k selection.
#[instrument(skip_all, name = "screening_workflow", fields(sites = problem.sublattice.len()))]
pub fn run<F>(
    problem: &ScreeningProblem,
    factory: &F,
    config: &ScreeningConfig,
    reporter: &ProgressReporter,
) -> Result<RankedResult, EngineError>
where
    F: ScorerFactory,
{
    // === Enumeration and canonicalization ===
    let UniqueConfigurations {
        candidates,
        raw_count,
        raw_checked,
    } = unique_configurations(problem, config, reporter)?;

    // === Parallel evaluation ===
    reporter.report(Progress::StageStart {
        stage: Stage::Evaluating,
    });
    info!(
        candidates = candidates.len(),
        workers = config.num_workers,
        batch_size = config.batch_size,
        "Scoring unique configurations."
    );
    let started = Instant::now();
    let evaluations = evaluator::evaluate(
        &candidates,
        factory,
        config.num_workers,
        config.batch_size,
        reporter,
    )?;
    let evaluation_time = started.elapsed();
    reporter.report(Progress::StageFinish {
        stage: Stage::Evaluating,
    });

    // === Ranking ===
    let unique_count = candidates.len();
    let (ranked, failures) = selection::rank(candidates, &evaluations, config.topk);
    let stats = ScreeningStats {
        sites: problem.sublattice.len(),
        group_order: problem.group.order(),
        raw_count,
        raw_checked,
        unique: unique_count,
        evaluated: evaluations.len() - failures.len(),
        failed: failures.len(),
        evaluation_time,
    };
    reporter.report(Progress::StageStart {
        stage: Stage::Ranked,
    });

    info!(
        ranked = ranked.len(),
        failed = stats.failed,
        "Screening complete."
    );
    Ok(RankedResult {
        ranked,
        failures,
        stats,
    })
}

/// [`run`] without progress reporting.
pub fn enumerate_and_rank<F>(
    problem: &ScreeningProblem,
    factory: &F,
    config: &ScreeningConfig,
) -> Result<RankedResult, EngineError>
where
    F: ScorerFactory,
{
    run(problem, factory, config, &ProgressReporter::new())
}

/// Validates the problem against the ceilings and returns one representative per symmetry
/// class, without scoring.
#[instrument(skip_all, name = "unique_configurations")]
pub fn unique_configurations(
    problem: &ScreeningProblem,
    config: &ScreeningConfig,
    reporter: &ProgressReporter,
) -> Result<UniqueConfigurations, EngineError> {
    let raw_count = check_problem(problem, config, reporter)?;
    let mut governor = SafetyGovernor::new(config);
    governor.check_raw(raw_count)?;
    reporter.report(Progress::StageFinish {
        stage: Stage::Configured,
    });

    reporter.report(Progress::StageStart {
        stage: Stage::Enumerating,
    });
    let n_sites = problem.sublattice.len();
    let mut enumerator = LabelingEnumerator::new(n_sites, &problem.counts)?;
    reporter.report(Progress::StageFinish {
        stage: Stage::Enumerating,
    });

    reporter.report(Progress::StageStart {
        stage: Stage::Canonicalizing,
    });
    info!(
        %raw_count,
        group_order = problem.group.order(),
        "Enumerating symmetry-distinct configurations."
    );
    reporter.report(Progress::TaskStart {
        total_steps: raw_count.exact().map_or(0, |c| c as u64),
    });

    let label_map = Arc::new(problem.counts.label_map());
    let mut canonicalizer = Canonicalizer::new(&problem.group);
    let mut candidates = Vec::new();
    while let Some(labeling) = enumerator.next() {
        if canonicalizer.observe(&labeling) {
            governor.record_unique(enumerator.emitted())?;
            candidates.push(Candidate {
                id: candidates.len(),
                configuration: Configuration::realize(
                    labeling,
                    &problem.sublattice,
                    label_map.clone(),
                ),
            });
        }
        if enumerator.emitted() % CANONICALIZATION_PROGRESS_STRIDE == 0 {
            reporter.report(Progress::TaskIncrement {
                steps: CANONICALIZATION_PROGRESS_STRIDE,
            });
        }
    }
    let raw_checked = enumerator.emitted();
    reporter.report(Progress::TaskIncrement {
        steps: raw_checked % CANONICALIZATION_PROGRESS_STRIDE,
    });
    reporter.report(Progress::Message(format!(
        "{} symmetry-distinct configurations among {raw_checked} labelings",
        candidates.len()
    )));
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::StageFinish {
        stage: Stage::Canonicalizing,
    });

    info!(
        raw_checked,
        unique = candidates.len(),
        "Canonicalization finished."
    );
    Ok(UniqueConfigurations {
        candidates,
        raw_count,
        raw_checked,
    })
}

fn check_problem(
    problem: &ScreeningProblem,
    config: &ScreeningConfig,
    reporter: &ProgressReporter,
) -> Result<RawCount, EngineError> {
    reporter.report(Progress::StageStart {
        stage: Stage::Configured,
    });
    config.validate()?;
    let n_sites = problem.sublattice.len();
    enumeration::validate(n_sites, &problem.counts)?;
    if problem.group.degree() != n_sites {
        return Err(SymmetryError::LengthMismatch {
            expected: n_sites,
            found: problem.group.degree(),
        }
        .into());
    }
    let raw_count = multinomial(&problem.counts.ordinal_counts());
    info!(
        host = problem.counts.host(),
        dopant_species = problem.counts.dopant_arity(),
        %raw_count,
        "Screening problem validated."
    );
    Ok(raw_count)
}
