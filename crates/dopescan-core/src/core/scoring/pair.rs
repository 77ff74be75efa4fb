use super::{Scorer, ScorerFactory, ScoringError};
use crate::core::models::labeling::Configuration;
use crate::core::models::species::LabelMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// On-site energies per species plus pair energies over a fixed neighbor list.
///
/// `E = Σ_i onsite[s_i] + Σ_(i,j) pair[{s_i, s_j}]`. Neighbor pairs refer to sublattice
/// positions. Species or pairs without an entry contribute zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairInteractionModel {
    #[serde(default)]
    pub onsite: BTreeMap<String, f64>,
    #[serde(default)]
    pub pairs: Vec<PairEnergy>,
    #[serde(default)]
    pub neighbors: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairEnergy {
    pub species: (String, String),
    pub energy: f64,
}

impl PairInteractionModel {
    pub fn new(neighbors: Vec<(usize, usize)>) -> Self {
        Self {
            neighbors,
            ..Self::default()
        }
    }

    pub fn with_onsite(mut self, species: &str, energy: f64) -> Self {
        self.onsite.insert(species.to_string(), energy);
        self
    }

    pub fn with_pair(mut self, a: &str, b: &str, energy: f64) -> Self {
        self.pairs.push(PairEnergy {
            species: (a.to_string(), b.to_string()),
            energy,
        });
        self
    }

    fn pair_energy(&self, a: &str, b: &str) -> f64 {
        self.pairs
            .iter()
            .filter(|p| {
                let (x, y) = (&p.species.0, &p.species.1);
                (x == a && y == b) || (x == b && y == a)
            })
            .map(|p| p.energy)
            .last()
            .unwrap_or(0.0)
    }
}

/// Ordinal-indexed energy tables for one label map.
#[derive(Debug, Clone, PartialEq)]
struct EnergyTables {
    label_map: LabelMap,
    onsite: Vec<f64>,
    pair: Vec<Vec<f64>>,
}

impl EnergyTables {
    fn build(model: &PairInteractionModel, label_map: &LabelMap) -> Self {
        let labels: Vec<&str> = label_map.iter().map(|(_, label)| label).collect();
        let onsite = labels
            .iter()
            .map(|l| model.onsite.get(*l).copied().unwrap_or(0.0))
            .collect();
        let pair = labels
            .iter()
            .map(|a| labels.iter().map(|b| model.pair_energy(a, b)).collect())
            .collect();
        Self {
            label_map: label_map.clone(),
            onsite,
            pair,
        }
    }
}

/// Worker-local evaluator of a [`PairInteractionModel`].
///
/// Resolves species labels to ordinal tables on first use and reuses them for every
/// configuration sharing the same label map.
pub struct PairInteractionScorer<'a> {
    model: &'a PairInteractionModel,
    tables: Option<EnergyTables>,
}

impl<'a> PairInteractionScorer<'a> {
    pub fn new(model: &'a PairInteractionModel) -> Self {
        Self {
            model,
            tables: None,
        }
    }

    fn tables_for(&mut self, label_map: &LabelMap) -> &EnergyTables {
        let tables = match self.tables.take() {
            Some(tables) if &tables.label_map == label_map => tables,
            _ => EnergyTables::build(self.model, label_map),
        };
        self.tables.insert(tables)
    }
}

impl Scorer for PairInteractionScorer<'_> {
    fn score(&mut self, configuration: &Configuration) -> Result<f64, ScoringError> {
        let n = configuration.len();
        let model = self.model;
        let neighbors = &model.neighbors;
        if let Some(&(i, j)) = neighbors.iter().find(|&&(i, j)| i >= n || j >= n) {
            return Err(ScoringError::Failed(format!(
                "neighbor pair ({i}, {j}) is outside the {n}-site sublattice"
            )));
        }

        let tables = self.tables_for(configuration.label_map());
        let labels = configuration.labeling().as_slice();

        let onsite: f64 = labels.iter().map(|&l| tables.onsite[l as usize]).sum();
        let pair: f64 = neighbors
            .iter()
            .map(|&(i, j)| tables.pair[labels[i] as usize][labels[j] as usize])
            .sum();
        Ok(onsite + pair)
    }
}

impl ScorerFactory for PairInteractionModel {
    type Scorer<'a>
        = PairInteractionScorer<'a>
    where
        Self: 'a;

    fn create(&self) -> Result<Self::Scorer<'_>, ScoringError> {
        Ok(PairInteractionScorer::new(self))
    }
}
