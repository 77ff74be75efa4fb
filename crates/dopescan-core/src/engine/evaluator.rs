use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::state::{Candidate, Evaluation};
use crate::core::scoring::{Scorer, ScorerFactory, ScoringError};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Everything one worker produced.
#[derive(Debug)]
struct WorkerOutput {
    evaluations: Vec<Evaluation>,
    init_error: Option<ScoringError>,
}

/// Scores every candidate exactly once and returns the evaluations sorted by candidate id.
///
/// `num_workers` threads each create their own scorer from `factory` and pull batches of
/// `batch_size` candidates from a shared cursor until the list is drained. Scorer errors,
/// panics and non-finite scores are recorded per candidate; a worker whose scorer cannot be
/// created stops pulling work and leaves it to the others. If no worker could create a
/// scorer, the unscored candidates carry the initialization error.
#[instrument(skip_all, name = "evaluation_task", fields(candidates = candidates.len()))]
pub fn evaluate<F>(
    candidates: &[Candidate],
    factory: &F,
    num_workers: usize,
    batch_size: usize,
    reporter: &ProgressReporter,
) -> Result<Vec<Evaluation>, EngineError>
where
    F: ScorerFactory,
{
    let batch_size = batch_size.max(1);
    reporter.report(Progress::TaskStart {
        total_steps: candidates.len() as u64,
    });

    let cursor = AtomicUsize::new(0);
    let outputs = run_workers(candidates, factory, num_workers, batch_size, &cursor, reporter)?;

    reporter.report(Progress::TaskFinish);

    let mut init_error = None;
    let mut evaluations = Vec::with_capacity(candidates.len());
    for output in outputs {
        if init_error.is_none() {
            init_error = output.init_error;
        }
        evaluations.extend(output.evaluations);
    }

    if evaluations.len() < candidates.len() {
        let error = init_error.unwrap_or_else(|| {
            ScoringError::Initialization("no worker was able to score candidates".to_string())
        });
        let scored: HashSet<usize> = evaluations.iter().map(|e| e.candidate_id).collect();
        let missing: Vec<Evaluation> = candidates
            .iter()
            .filter(|c| !scored.contains(&c.id))
            .map(|c| Evaluation {
                candidate_id: c.id,
                outcome: Err(error.clone()),
                wall_time: Duration::ZERO,
            })
            .collect();
        warn!(
            unscored = missing.len(),
            %error,
            "Candidates left unscored after every worker failed to initialize."
        );
        evaluations.extend(missing);
    }

    evaluations.sort_by_key(|e| e.candidate_id);

    let failed = evaluations.iter().filter(|e| e.outcome.is_err()).count();
    info!(
        evaluated = evaluations.len() - failed,
        failed, "Evaluation finished."
    );
    Ok(evaluations)
}

#[cfg(feature = "parallel")]
fn run_workers<F>(
    candidates: &[Candidate],
    factory: &F,
    num_workers: usize,
    batch_size: usize,
    cursor: &AtomicUsize,
    reporter: &ProgressReporter,
) -> Result<Vec<WorkerOutput>, EngineError>
where
    F: ScorerFactory,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.max(1))
        .thread_name(|idx| format!("dopescan-scorer-{idx}"))
        .build()
        .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

    Ok(pool.broadcast(|ctx| {
        run_worker(
            ctx.index(),
            candidates,
            factory,
            batch_size,
            cursor,
            reporter,
        )
    }))
}

#[cfg(not(feature = "parallel"))]
fn run_workers<F>(
    candidates: &[Candidate],
    factory: &F,
    _num_workers: usize,
    batch_size: usize,
    cursor: &AtomicUsize,
    reporter: &ProgressReporter,
) -> Result<Vec<WorkerOutput>, EngineError>
where
    F: ScorerFactory,
{
    let output = run_worker(0, candidates, factory, batch_size, cursor, reporter);
    Ok(vec![output])
}

fn run_worker<F>(
    worker: usize,
    candidates: &[Candidate],
    factory: &F,
    batch_size: usize,
    cursor: &AtomicUsize,
    reporter: &ProgressReporter,
) -> WorkerOutput
where
    F: ScorerFactory,
{
    let mut scorer = match create_scorer(factory) {
        Ok(scorer) => scorer,
        Err(error) => {
            warn!(worker, %error, "Scorer initialization failed; worker is idle.");
            return WorkerOutput {
                evaluations: Vec::new(),
                init_error: Some(error),
            };
        }
    };
    debug!(worker, "Scorer initialized.");

    let mut evaluations = Vec::new();
    loop {
        let start = cursor.fetch_add(batch_size, Ordering::Relaxed);
        if start >= candidates.len() {
            break;
        }
        let end = (start + batch_size).min(candidates.len());
        for candidate in &candidates[start..end] {
            evaluations.push(score_candidate(&mut scorer, candidate));
        }
        reporter.report(Progress::TaskIncrement {
            steps: (end - start) as u64,
        });
    }

    WorkerOutput {
        evaluations,
        init_error: None,
    }
}

fn create_scorer<F>(factory: &F) -> Result<F::Scorer<'_>, ScoringError>
where
    F: ScorerFactory,
{
    catch_unwind(AssertUnwindSafe(|| factory.create())).unwrap_or_else(|payload| {
        Err(ScoringError::Initialization(panic_message(payload.as_ref())))
    })
}

fn score_candidate<S: Scorer>(scorer: &mut S, candidate: &Candidate) -> Evaluation {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| scorer.score(&candidate.configuration)))
        .unwrap_or_else(|payload| Err(ScoringError::Failed(panic_message(payload.as_ref()))))
        .and_then(|score| {
            if score.is_finite() {
                Ok(score)
            } else {
                Err(ScoringError::NonFinite(score))
            }
        });
    let wall_time = started.elapsed();

    if let Err(error) = &outcome {
        warn!(
            candidate = candidate.id,
            signature = %candidate.signature(),
            %error,
            "Candidate scoring failed."
        );
    }

    Evaluation {
        candidate_id: candidate.id,
        outcome,
        wall_time,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("scorer panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("scorer panicked: {msg}")
    } else {
        "scorer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::labeling::{Configuration, Labeling};
    use crate::core::models::species::SpeciesCounts;
    use crate::core::models::sublattice::Sublattice;
    use crate::core::scoring::FnScorer;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn setup_candidates(n: usize) -> Vec<Candidate> {
        let sublattice = Sublattice::contiguous(n).unwrap();
        let label_map = Arc::new(SpeciesCounts::with_dopants("Ti", n - 1, [("Nb", 1)]).label_map());
        (0..n)
            .map(|id| {
                let mut labels = vec![0u8; n];
                labels[id] = 1;
                Candidate {
                    id,
                    configuration: Configuration::realize(
                        Labeling::new(labels),
                        &sublattice,
                        label_map.clone(),
                    ),
                }
            })
            .collect()
    }

    fn dopant_position(configuration: &Configuration) -> usize {
        configuration
            .labeling()
            .as_slice()
            .iter()
            .position(|&l| l == 1)
            .unwrap()
    }

    #[test]
    fn every_candidate_is_scored_once_and_sorted_by_id() {
        let candidates = setup_candidates(10);
        let factory = FnScorer::new(|c: &Configuration| Ok(dopant_position(c) as f64 * 2.0));
        let evaluations =
            evaluate(&candidates, &factory, 4, 3, &ProgressReporter::new()).unwrap();

        assert_eq!(evaluations.len(), 10);
        for (idx, evaluation) in evaluations.iter().enumerate() {
            assert_eq!(evaluation.candidate_id, idx);
            assert_eq!(evaluation.outcome, Ok(idx as f64 * 2.0));
        }
    }

    #[test]
    fn results_do_not_depend_on_pool_size() {
        let candidates = setup_candidates(12);
        let factory = FnScorer::new(|c: &Configuration| Ok((dopant_position(c) % 5) as f64));
        let outcomes = |workers| -> Vec<_> {
            evaluate(&candidates, &factory, workers, 2, &ProgressReporter::new())
                .unwrap()
                .into_iter()
                .map(|e| (e.candidate_id, e.outcome))
                .collect()
        };
        assert_eq!(outcomes(1), outcomes(8));
    }

    #[test]
    fn failures_panics_and_non_finite_scores_are_recorded() {
        let candidates = setup_candidates(10);
        let factory = FnScorer::new(|c: &Configuration| match dopant_position(c) {
            2 => Err(ScoringError::Failed("relaxation diverged".to_string())),
            5 => panic!("boom"),
            7 => Ok(f64::NAN),
            p => Ok(p as f64),
        });
        let evaluations =
            evaluate(&candidates, &factory, 3, 2, &ProgressReporter::new()).unwrap();

        assert_eq!(evaluations.len(), 10);
        assert!(matches!(evaluations[2].outcome, Err(ScoringError::Failed(ref m)) if m == "relaxation diverged"));
        assert!(matches!(evaluations[5].outcome, Err(ScoringError::Failed(ref m)) if m.contains("boom")));
        assert!(matches!(evaluations[7].outcome, Err(ScoringError::NonFinite(s)) if s.is_nan()));
        assert_eq!(evaluations.iter().filter(|e| e.outcome.is_ok()).count(), 7);
    }

    struct CountingFactory {
        created: AtomicUsize,
        fail_init: bool,
    }

    struct CountingScorer;

    impl Scorer for CountingScorer {
        fn score(&mut self, _configuration: &Configuration) -> Result<f64, ScoringError> {
            Ok(1.0)
        }
    }

    impl ScorerFactory for CountingFactory {
        type Scorer<'a> = CountingScorer;

        fn create(&self) -> Result<CountingScorer, ScoringError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                Err(ScoringError::Initialization("model file missing".to_string()))
            } else {
                Ok(CountingScorer)
            }
        }
    }

    #[test]
    fn scorer_is_created_at_most_once_per_worker() {
        let candidates = setup_candidates(20);
        let factory = CountingFactory {
            created: AtomicUsize::new(0),
            fail_init: false,
        };
        let evaluations =
            evaluate(&candidates, &factory, 4, 1, &ProgressReporter::new()).unwrap();

        assert_eq!(evaluations.len(), 20);
        let created = factory.created.load(Ordering::SeqCst);
        assert!((1..=4).contains(&created), "created {created} scorers");
    }

    #[test]
    fn failed_initialization_marks_candidates_as_failed() {
        let candidates = setup_candidates(5);
        let factory = CountingFactory {
            created: AtomicUsize::new(0),
            fail_init: true,
        };
        let evaluations =
            evaluate(&candidates, &factory, 2, 2, &ProgressReporter::new()).unwrap();

        assert_eq!(evaluations.len(), 5);
        assert!(evaluations.iter().all(|e| matches!(
            e.outcome,
            Err(ScoringError::Initialization(ref m)) if m == "model file missing"
        )));
    }

    #[test]
    fn progress_counts_every_candidate() {
        let candidates = setup_candidates(7);
        let steps = Mutex::new(0u64);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TaskIncrement { steps: n } = event {
                *steps.lock().unwrap() += n;
            }
        }));
        let factory = FnScorer::new(|_: &Configuration| Ok(0.0));
        evaluate(&candidates, &factory, 3, 2, &reporter).unwrap();
        drop(reporter);
        assert_eq!(steps.into_inner().unwrap(), 7);
    }

    #[test]
    fn empty_candidate_list_yields_no_evaluations() {
        let factory = FnScorer::new(|_: &Configuration| Ok(0.0));
        let evaluations = evaluate(&[], &factory, 2, 5, &ProgressReporter::new()).unwrap();
        assert!(evaluations.is_empty());
    }
}
