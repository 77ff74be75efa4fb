use serde::Serialize;
use std::collections::BTreeMap;

/// Number of species placed on a sublattice, split into the host and its dopants.
///
/// Dopants are kept in a `BTreeMap` so that every derived order (label ordinals, enumeration
/// order, signatures) depends only on the species labels and never on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCounts {
    host: String,
    host_count: usize,
    dopants: BTreeMap<String, usize>,
}

impl SpeciesCounts {
    /// Builds the counts from a full `label -> count` mapping that includes the host.
    ///
    /// A host missing from `counts` is treated as a fully substituted sublattice (count 0).
    /// Dopants with a zero count are dropped, they do not take part in the enumeration.
    pub fn new<I, S>(host: impl Into<String>, counts: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let host = host.into();
        let mut host_count = 0;
        let mut dopants = BTreeMap::new();
        for (label, count) in counts {
            let label = label.into();
            if label == host {
                host_count += count;
            } else if count > 0 {
                *dopants.entry(label).or_insert(0) += count;
            }
        }
        Self {
            host,
            host_count,
            dopants,
        }
    }

    pub fn with_dopants<I, S>(host: impl Into<String>, host_count: usize, dopants: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let host = host.into();
        let counts = dopants
            .into_iter()
            .map(|(label, count)| (label.into(), count))
            .chain(std::iter::once((host.clone(), host_count)))
            .collect::<Vec<(String, usize)>>();
        Self::new(host, counts)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn host_count(&self) -> usize {
        self.host_count
    }

    pub fn dopants(&self) -> impl Iterator<Item = (&str, usize)> {
        self.dopants.iter().map(|(label, &count)| (label.as_str(), count))
    }

    pub fn dopant_count(&self, label: &str) -> Option<usize> {
        self.dopants.get(label).copied()
    }

    /// Number of distinct non-host species.
    pub fn dopant_arity(&self) -> usize {
        self.dopants.len()
    }

    pub fn total(&self) -> usize {
        self.host_count + self.dopants.values().sum::<usize>()
    }

    pub fn label_map(&self) -> LabelMap {
        let mut labels = Vec::with_capacity(self.dopants.len() + 1);
        labels.push(self.host.clone());
        labels.extend(self.dopants.keys().cloned());
        LabelMap { labels }
    }

    /// Counts indexed by label ordinal (host first, then dopants in label order).
    pub fn ordinal_counts(&self) -> Vec<usize> {
        std::iter::once(self.host_count)
            .chain(self.dopants.values().copied())
            .collect()
    }
}

/// Stable ordinal encoding of species labels: the host is `0`, dopants follow in label order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub const HOST: u8 = 0;

    pub fn label(&self, ordinal: u8) -> Option<&str> {
        self.labels.get(ordinal as usize).map(String::as_str)
    }

    pub fn ordinal(&self, label: &str) -> Option<u8> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| idx as u8)
    }

    pub fn host(&self) -> &str {
        &self.labels[Self::HOST as usize]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx as u8, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_splits_host_from_dopants() {
        let counts = SpeciesCounts::new("Ti", [("Ti", 6), ("Nb", 1), ("Sb", 1)]);
        assert_eq!(counts.host(), "Ti");
        assert_eq!(counts.host_count(), 6);
        assert_eq!(counts.dopant_count("Nb"), Some(1));
        assert_eq!(counts.dopant_arity(), 2);
        assert_eq!(counts.total(), 8);
    }

    #[test]
    fn zero_count_dopants_are_dropped() {
        let counts = SpeciesCounts::new("Ti", [("Ti", 4), ("Nb", 0)]);
        assert_eq!(counts.dopant_arity(), 0);
        assert_eq!(counts.dopant_count("Nb"), None);
    }

    #[test]
    fn missing_host_means_fully_substituted() {
        let counts = SpeciesCounts::new("Ti", [("Nb", 2), ("Sb", 2)]);
        assert_eq!(counts.host_count(), 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn label_map_puts_host_first_and_sorts_dopants() {
        let counts = SpeciesCounts::with_dopants("Sn", 5, [("Zr", 1), ("Ba", 1), ("Nb", 1)]);
        let map = counts.label_map();
        assert_eq!(map.label(0), Some("Sn"));
        assert_eq!(map.label(1), Some("Ba"));
        assert_eq!(map.label(2), Some("Nb"));
        assert_eq!(map.label(3), Some("Zr"));
        assert_eq!(map.ordinal("Zr"), Some(3));
        assert_eq!(map.ordinal("O"), None);
        assert_eq!(map.host(), "Sn");
    }

    #[test]
    fn ordinal_counts_follow_label_map_order() {
        let counts = SpeciesCounts::with_dopants("Sn", 5, [("Zr", 3), ("Ba", 2)]);
        assert_eq!(counts.ordinal_counts(), vec![5, 2, 3]);
    }

    #[test]
    fn duplicate_dopant_entries_are_summed() {
        let counts = SpeciesCounts::new("Ti", [("Nb", 1), ("Ti", 2), ("Nb", 1)]);
        assert_eq!(counts.dopant_count("Nb"), Some(2));
    }
}
