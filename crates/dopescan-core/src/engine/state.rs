use crate::core::models::labeling::{Configuration, Labeling};
use crate::core::scoring::ScoringError;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a screening run.
///
/// `Configured → Enumerating → Canonicalizing → Evaluating → Ranked`. Configuration and
/// limit errors end the run before `Evaluating`; scoring failures never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configured,
    Enumerating,
    Canonicalizing,
    Evaluating,
    Ranked,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Configured => "Configured",
            Stage::Enumerating => "Enumerating",
            Stage::Canonicalizing => "Canonicalizing",
            Stage::Evaluating => "Evaluating",
            Stage::Ranked => "Ranked",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First-seen representative of a symmetry class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Discovery order during enumeration, starting at 0.
    pub id: usize,
    pub configuration: Configuration,
}

impl Candidate {
    pub fn labeling(&self) -> &Labeling {
        self.configuration.labeling()
    }

    pub fn signature(&self) -> String {
        self.configuration.signature()
    }
}

/// Outcome of scoring one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub candidate_id: usize,
    pub outcome: Result<f64, ScoringError>,
    pub wall_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_match_display() {
        for stage in [
            Stage::Configured,
            Stage::Enumerating,
            Stage::Canonicalizing,
            Stage::Evaluating,
            Stage::Ranked,
        ] {
            assert_eq!(stage.to_string(), stage.name());
        }
    }
}
