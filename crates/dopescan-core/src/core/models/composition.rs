use super::species::SpeciesCounts;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

const PERCENT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum CompositionError {
    #[error("Composition is empty")]
    Empty,
    #[error("Invalid species label: {0:?}")]
    InvalidSpecies(String),
    #[error("Percent for {species} is not a finite number: {percent}")]
    NonFinitePercent { species: String, percent: f64 },
    #[error("Negative percent for {species}: {percent}")]
    NegativePercent { species: String, percent: f64 },
    #[error("Requested total dopant percent exceeds 100%: {0}")]
    TotalExceeds(f64),
    #[error(
        "Rounded dopant atoms ({atoms}) exceed host sites ({sites}). Reduce requested doping or increase the supercell"
    )]
    TooManyDopantAtoms { atoms: usize, sites: usize },
}

/// Integer dopant counts obtained by rounding requested percentages on `n_sites` sites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundedComposition {
    pub n_sites: usize,
    pub counts: BTreeMap<String, usize>,
    pub effective_percent: BTreeMap<String, f64>,
    pub requested_total_percent: f64,
    pub effective_total_percent: f64,
    pub warnings: Vec<String>,
}

impl RoundedComposition {
    /// Rounds each requested percent (relative to the substitutable sites) to the nearest whole
    /// number of atoms, ties to even. Deviations from the request are reported as warnings.
    pub fn from_percentages(
        n_sites: usize,
        requested: &BTreeMap<String, f64>,
    ) -> Result<Self, CompositionError> {
        if requested.is_empty() {
            return Err(CompositionError::Empty);
        }
        for (species, &percent) in requested {
            if species.trim().is_empty() {
                return Err(CompositionError::InvalidSpecies(species.clone()));
            }
            if !percent.is_finite() {
                return Err(CompositionError::NonFinitePercent {
                    species: species.clone(),
                    percent,
                });
            }
            if percent < 0.0 {
                return Err(CompositionError::NegativePercent {
                    species: species.clone(),
                    percent,
                });
            }
        }

        let requested_total_percent: f64 = requested.values().sum();
        if requested_total_percent > 100.0 + PERCENT_TOLERANCE {
            return Err(CompositionError::TotalExceeds(requested_total_percent));
        }

        let mut counts = BTreeMap::new();
        let mut effective_percent = BTreeMap::new();
        let mut warnings = Vec::new();

        for (species, &percent) in requested {
            let count = (percent * n_sites as f64 / 100.0).round_ties_even() as usize;
            let effective = if n_sites > 0 {
                100.0 * count as f64 / n_sites as f64
            } else {
                0.0
            };
            if (effective - percent).abs() > PERCENT_TOLERANCE {
                warnings.push(format!(
                    "{species}: requested {percent}% -> rounded to {count} atoms -> effective {effective:.6}%"
                ));
            }
            counts.insert(species.clone(), count);
            effective_percent.insert(species.clone(), effective);
        }

        let effective_total_percent: f64 = effective_percent.values().sum();
        if (effective_total_percent - requested_total_percent).abs() > PERCENT_TOLERANCE {
            warnings.push(format!(
                "Total: requested {requested_total_percent}% -> effective {effective_total_percent:.6}% after rounding"
            ));
        }

        let atoms: usize = counts.values().sum();
        if atoms > n_sites {
            return Err(CompositionError::TooManyDopantAtoms {
                atoms,
                sites: n_sites,
            });
        }

        Ok(Self {
            n_sites,
            counts,
            effective_percent,
            requested_total_percent,
            effective_total_percent,
            warnings,
        })
    }

    /// Species counts with the host filling every site not taken by a dopant.
    pub fn to_species_counts(&self, host: &str) -> SpeciesCounts {
        let dopant_atoms: usize = self.counts.values().sum();
        SpeciesCounts::with_dopants(
            host,
            self.n_sites - dopant_atoms,
            self.counts.iter().map(|(s, &c)| (s.clone(), c)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn exact_percentages_round_without_warnings() {
        let rounded = RoundedComposition::from_percentages(20, &request(&[("Nb", 10.0)])).unwrap();
        assert_eq!(rounded.counts["Nb"], 2);
        assert!((rounded.effective_percent["Nb"] - 10.0).abs() < 1e-12);
        assert!(rounded.warnings.is_empty());
    }

    #[test]
    fn inexact_percentages_produce_warnings() {
        let rounded =
            RoundedComposition::from_percentages(16, &request(&[("Nb", 5.0), ("Sb", 10.0)]))
                .unwrap();
        assert_eq!(rounded.counts["Nb"], 1);
        assert_eq!(rounded.counts["Sb"], 2);
        assert!((rounded.effective_percent["Nb"] - 6.25).abs() < 1e-12);
        assert_eq!(rounded.warnings.len(), 3);
        assert!(rounded.warnings[0].starts_with("Nb: requested 5%"));
    }

    #[test]
    fn half_atoms_round_to_even() {
        let rounded = RoundedComposition::from_percentages(10, &request(&[("Nb", 25.0)])).unwrap();
        assert_eq!(rounded.counts["Nb"], 2);
    }

    #[test]
    fn invalid_requests_are_rejected() {
        assert_eq!(
            RoundedComposition::from_percentages(10, &BTreeMap::new()),
            Err(CompositionError::Empty)
        );
        assert!(matches!(
            RoundedComposition::from_percentages(10, &request(&[("Nb", -1.0)])),
            Err(CompositionError::NegativePercent { .. })
        ));
        assert!(matches!(
            RoundedComposition::from_percentages(10, &request(&[("Nb", 60.0), ("Sb", 50.0)])),
            Err(CompositionError::TotalExceeds(_))
        ));
        assert!(matches!(
            RoundedComposition::from_percentages(10, &request(&[(" ", 5.0)])),
            Err(CompositionError::InvalidSpecies(_))
        ));
    }

    #[test]
    fn non_finite_percentages_are_rejected() {
        for percent in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = RoundedComposition::from_percentages(10, &request(&[("Nb", percent)]));
            assert!(
                matches!(
                    &result,
                    Err(CompositionError::NonFinitePercent { species, .. }) if species == "Nb"
                ),
                "{percent}: {result:?}"
            );
        }
    }

    #[test]
    fn rounding_up_beyond_site_count_is_rejected() {
        let result =
            RoundedComposition::from_percentages(3, &request(&[("Nb", 50.0), ("Sb", 50.0)]));
        assert_eq!(
            result,
            Err(CompositionError::TooManyDopantAtoms { atoms: 4, sites: 3 })
        );
    }

    #[test]
    fn to_species_counts_fills_remaining_sites_with_host() {
        let rounded = RoundedComposition::from_percentages(20, &request(&[("Nb", 10.0)])).unwrap();
        let counts = rounded.to_species_counts("Ti");
        assert_eq!(counts.host_count(), 18);
        assert_eq!(counts.dopant_count("Nb"), Some(2));
        assert_eq!(counts.total(), 20);
    }
}
