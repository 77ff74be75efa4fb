use std::collections::{HashSet, VecDeque};
use std::ops::Index;
use thiserror::Error;
use tracing::warn;

/// Upper bound on the order of a group closed from an explicit permutation list.
pub const DEFAULT_MAX_ORDER: usize = 100_000;

#[derive(Debug, Error, PartialEq)]
pub enum SymmetryError {
    #[error("Permutation has length {found}, expected {expected} sublattice sites")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Permutation is not a bijection: index {index} is out of range or repeated")]
    NotABijection { index: usize },

    #[error(
        "Failed to match symmetry-mapped site {site} under operation {operation} (min dist^2={distance_sq})"
    )]
    UnmatchedSite {
        operation: usize,
        site: usize,
        distance_sq: f64,
    },

    #[error("Missing fractional coordinates for parent site {0}")]
    MissingCoordinates(usize),

    #[error("Group generated from the given generators exceeds {limit} elements")]
    GroupTooLarge { limit: usize },
}

/// A bijection on sublattice positions `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    pub fn new(n: usize, map: Vec<usize>) -> Result<Self, SymmetryError> {
        if map.len() != n {
            return Err(SymmetryError::LengthMismatch {
                expected: n,
                found: map.len(),
            });
        }
        let mut hit = vec![false; n];
        for &target in &map {
            if target >= n || hit[target] {
                return Err(SymmetryError::NotABijection { index: target });
            }
            hit[target] = true;
        }
        Ok(Self(map))
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &j)| i == j)
    }

    /// `(self ∘ other)[i] = self[other[i]]`.
    pub fn compose(&self, other: &Permutation) -> Permutation {
        Permutation(other.0.iter().map(|&i| self.0[i]).collect())
    }

    pub fn inverse(&self) -> Permutation {
        let mut inv = vec![0; self.0.len()];
        for (i, &j) in self.0.iter().enumerate() {
            inv[j] = i;
        }
        Permutation(inv)
    }
}

impl Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}

/// Finite set of site permutations containing the identity, without duplicates.
///
/// The identity is always the first element. Built once per sublattice and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationGroup {
    degree: usize,
    elements: Vec<Permutation>,
}

impl PermutationGroup {
    pub fn trivial(n: usize) -> Self {
        Self {
            degree: n,
            elements: vec![Permutation::identity(n)],
        }
    }

    /// Validates every map, drops duplicates (keeping first occurrence), adds the identity and
    /// closes the set under composition.
    ///
    /// The listed maps come first in element order; products missing from the list are
    /// appended after them. The closure is capped at [`DEFAULT_MAX_ORDER`] elements.
    pub fn from_permutations<I>(n: usize, maps: I) -> Result<Self, SymmetryError>
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let identity = Permutation::identity(n);
        let mut seen = HashSet::new();
        seen.insert(identity.clone());
        let mut elements = vec![identity];

        for map in maps {
            let perm = Permutation::new(n, map)?;
            if seen.insert(perm.clone()) {
                elements.push(perm);
            }
        }

        let listed = elements.len();
        let generators = elements[1..].to_vec();
        let elements = close(elements, seen, &generators, DEFAULT_MAX_ORDER)?;
        if elements.len() > listed {
            warn!(
                listed,
                closed = elements.len(),
                "Permutation list is not closed under composition; using the group it generates."
            );
        }
        Ok(Self {
            degree: n,
            elements,
        })
    }

    /// Closure of `generators` under composition, enumerated breadth-first.
    pub fn generate<I>(n: usize, generators: I, max_order: usize) -> Result<Self, SymmetryError>
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let generators = generators
            .into_iter()
            .map(|map| Permutation::new(n, map))
            .collect::<Result<Vec<_>, _>>()?;

        let identity = Permutation::identity(n);
        let seen = HashSet::from([identity.clone()]);
        let elements = close(vec![identity], seen, &generators, max_order)?;
        Ok(Self {
            degree: n,
            elements,
        })
    }

    /// Rotations of `n` sites arranged on a ring.
    pub fn cyclic(n: usize) -> Self {
        let elements = (0..n.max(1))
            .map(|shift| Permutation((0..n).map(|i| (i + shift) % n.max(1)).collect()))
            .collect();
        Self {
            degree: n,
            elements,
        }
    }

    /// Rotations followed by reflections of `n` sites arranged on a ring.
    pub fn dihedral(n: usize) -> Self {
        let mut group = Self::cyclic(n);
        if n > 2 {
            for shift in 0..n {
                group
                    .elements
                    .push(Permutation((0..n).map(|i| (shift + n - i) % n).collect()));
            }
        }
        group
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn order(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permutation> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[Permutation] {
        &self.elements
    }

    pub fn contains(&self, perm: &Permutation) -> bool {
        self.elements.contains(perm)
    }

    pub fn is_closed(&self) -> bool {
        let members: HashSet<&Permutation> = self.elements.iter().collect();
        self.elements.iter().all(|a| {
            self.elements
                .iter()
                .all(|b| members.contains(&a.compose(b)))
        })
    }
}

/// Extends `elements` with every product `g ∘ e` until no new permutation appears.
///
/// `seen` must hold exactly the permutations in `elements`.
fn close(
    mut elements: Vec<Permutation>,
    mut seen: HashSet<Permutation>,
    generators: &[Permutation],
    max_order: usize,
) -> Result<Vec<Permutation>, SymmetryError> {
    if elements.len() > max_order {
        return Err(SymmetryError::GroupTooLarge { limit: max_order });
    }
    let mut queue: VecDeque<Permutation> = elements.iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        for generator in generators {
            let next = generator.compose(&current);
            if seen.insert(next.clone()) {
                if elements.len() >= max_order {
                    return Err(SymmetryError::GroupTooLarge { limit: max_order });
                }
                elements.push(next.clone());
                queue.push_back(next);
            }
        }
    }
    Ok(elements)
}
