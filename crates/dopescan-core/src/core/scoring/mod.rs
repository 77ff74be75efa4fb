//! # Scoring Module
//!
//! The energy model is a capability supplied by the caller. It is typically expensive to
//! initialize (a loaded machine-learned potential, a parsed parameter set) and cheap-ish to
//! evaluate, so it is split into two halves:
//!
//! - [`ScorerFactory`] is shared read-only by the evaluator and creates one scorer per worker.
//! - [`Scorer`] is owned by exactly one worker and may keep mutable state between candidates.
//!
//! Lower scores are better. A scorer reports per-candidate failures through [`ScoringError`];
//! the evaluator records them and keeps going.
//!
//! [`pair`] provides a reference on-site + pair-interaction model.

pub mod pair;

use crate::core::models::labeling::Configuration;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Scorer failed: {0}")]
    Failed(String),
    #[error("Scorer returned a non-finite score: {0}")]
    NonFinite(f64),
    #[error("Scorer initialization failed: {0}")]
    Initialization(String),
    #[error("Scoring timed out after {0:?}")]
    Timeout(Duration),
}

pub trait Scorer {
    fn score(&mut self, configuration: &Configuration) -> Result<f64, ScoringError>;
}

pub trait ScorerFactory: Sync {
    type Scorer<'a>: Scorer
    where
        Self: 'a;

    /// Acquires a worker-local scorer. Called once per worker, on the worker's own thread.
    fn create(&self) -> Result<Self::Scorer<'_>, ScoringError>;
}

/// Adapts a stateless scoring function into a factory.
#[derive(Debug, Clone, Copy)]
pub struct FnScorer<F>(pub F);

impl<F> FnScorer<F>
where
    F: Fn(&Configuration) -> Result<f64, ScoringError> + Sync,
{
    pub fn new(score: F) -> Self {
        Self(score)
    }
}

pub struct FnScorerHandle<'a, F>(&'a F);

impl<F> Scorer for FnScorerHandle<'_, F>
where
    F: Fn(&Configuration) -> Result<f64, ScoringError>,
{
    fn score(&mut self, configuration: &Configuration) -> Result<f64, ScoringError> {
        (self.0)(configuration)
    }
}

impl<F> ScorerFactory for FnScorer<F>
where
    F: Fn(&Configuration) -> Result<f64, ScoringError> + Sync,
{
    type Scorer<'a>
        = FnScorerHandle<'a, F>
    where
        Self: 'a;

    fn create(&self) -> Result<Self::Scorer<'_>, ScoringError> {
        Ok(FnScorerHandle(&self.0))
    }
}
