use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Parameter '{0}' must be greater than zero")]
    NotPositive(&'static str),
}

/// Limits and resources of one screening run. Every value is a positive integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningConfig {
    /// Number of lowest-scoring candidates to keep.
    pub topk: usize,
    /// Inclusive ceiling on the raw labeling count `N! / ∏ count_i!`.
    pub max_enum: u64,
    /// Inclusive ceiling on the number of symmetry-distinct configurations.
    pub max_unique: usize,
    /// Size of the scoring worker pool.
    pub num_workers: usize,
    /// Candidates handed to a worker at a time.
    pub batch_size: usize,
}

#[derive(Default)]
pub struct ScreeningConfigBuilder {
    topk: Option<usize>,
    max_enum: Option<u64>,
    max_unique: Option<usize>,
    num_workers: Option<usize>,
    batch_size: Option<usize>,
}

impl ScreeningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topk(mut self, k: usize) -> Self {
        self.topk = Some(k);
        self
    }
    pub fn max_enum(mut self, ceiling: u64) -> Self {
        self.max_enum = Some(ceiling);
        self
    }
    pub fn max_unique(mut self, ceiling: usize) -> Self {
        self.max_unique = Some(ceiling);
        self
    }
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.num_workers = Some(workers);
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// `num_workers` defaults to the available parallelism and `batch_size` to
    /// [`DEFAULT_BATCH_SIZE`]; the ceilings and `topk` have no default.
    pub fn build(self) -> Result<ScreeningConfig, ConfigError> {
        let config = ScreeningConfig {
            topk: self.topk.ok_or(ConfigError::MissingParameter("topk"))?,
            max_enum: self
                .max_enum
                .ok_or(ConfigError::MissingParameter("max_enum"))?,
            max_unique: self
                .max_unique
                .ok_or(ConfigError::MissingParameter("max_unique"))?,
            num_workers: self.num_workers.unwrap_or_else(default_num_workers),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}

impl ScreeningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topk == 0 {
            return Err(ConfigError::NotPositive("topk"));
        }
        if self.max_enum == 0 {
            return Err(ConfigError::NotPositive("max_enum"));
        }
        if self.max_unique == 0 {
            return Err(ConfigError::NotPositive("max_unique"));
        }
        if self.num_workers == 0 {
            return Err(ConfigError::NotPositive("num_workers"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NotPositive("batch_size"));
        }
        Ok(())
    }
}

pub fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
