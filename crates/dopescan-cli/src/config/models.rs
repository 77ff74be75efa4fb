use dopescan::ScreeningProblem;
use dopescan::core::models::composition::RoundedComposition;
use dopescan::core::scoring::pair::PairInteractionModel;
use dopescan::engine::config::ScreeningConfig;
use std::path::PathBuf;

pub struct AppConfig {
    pub output_dir: PathBuf,
    pub problem: ScreeningProblem,
    pub model: PairInteractionModel,
    pub screening: ScreeningConfig,
    /// Present when the dopant counts were derived from percentages.
    pub composition: Option<RoundedComposition>,
    /// Name of the symmetry source, recorded in the summary.
    pub symmetry_kind: &'static str,
}
