use crate::error::{CliError, Result};
use dopescan::core::scoring::pair::{PairEnergy, PairInteractionModel};
use dopescan::core::symmetry::provider::SymmetryOperation;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSublatticeConfig {
    pub host: Option<String>,
    /// Species of every parent site, in structure order.
    pub site_species: Option<Vec<String>>,
    /// Spectator species that never take part in the substitution.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Number of sites when no per-site species list is given.
    pub sites: Option<usize>,
    pub parent_indices: Option<Vec<usize>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDopantsConfig {
    /// Dopant percentages relative to the number of sublattice sites.
    pub percent: Option<BTreeMap<String, f64>>,
    /// Absolute dopant atom counts.
    pub count: Option<BTreeMap<String, usize>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSymmetryOperation {
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl From<FileSymmetryOperation> for SymmetryOperation {
    fn from(op: FileSymmetryOperation) -> Self {
        SymmetryOperation::from_rows(op.rotation, op.translation)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum FileSymmetryConfig {
    Trivial,
    Cyclic,
    Dihedral,
    Permutations {
        maps: Vec<Vec<usize>>,
    },
    Generators {
        generators: Vec<Vec<usize>>,
        #[serde(rename = "max-order")]
        max_order: Option<usize>,
    },
    Crystal {
        /// Fractional coordinates of every parent site.
        coords: Vec<[f64; 3]>,
        operations: Vec<FileSymmetryOperation>,
        symprec: Option<f64>,
    },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilePairEnergy {
    pub species: [String; 2],
    pub energy: f64,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileScorerConfig {
    #[serde(default)]
    pub onsite: BTreeMap<String, f64>,
    #[serde(default)]
    pub pairs: Vec<FilePairEnergy>,
    #[serde(default)]
    pub neighbors: Vec<[usize; 2]>,
}

impl From<FileScorerConfig> for PairInteractionModel {
    fn from(file: FileScorerConfig) -> Self {
        PairInteractionModel {
            onsite: file.onsite,
            pairs: file
                .pairs
                .into_iter()
                .map(|p| {
                    let [a, b] = p.species;
                    PairEnergy {
                        species: (a, b),
                        energy: p.energy,
                    }
                })
                .collect(),
            neighbors: file.neighbors.into_iter().map(|[i, j]| (i, j)).collect(),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileScreeningConfig {
    pub topk: Option<usize>,
    pub max_enum: Option<u64>,
    pub max_unique: Option<usize>,
    pub batch_size: Option<usize>,
    pub num_workers: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub sublattice: Option<FileSublatticeConfig>,
    pub dopants: Option<FileDopantsConfig>,
    pub symmetry: Option<FileSymmetryConfig>,
    pub scorer: Option<FileScorerConfig>,
    pub screening: Option<FileScreeningConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
