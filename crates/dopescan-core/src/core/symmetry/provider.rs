use super::group::{DEFAULT_MAX_ORDER, PermutationGroup, SymmetryError};
use crate::core::models::sublattice::Sublattice;
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

const SYMPREC_MATCH_FACTOR: f64 = 10.0;

/// Supplies the symmetry group acting on a sublattice.
///
/// The engine only needs a finite set of position permutations; implementations decide how to
/// obtain it (synthetic groups, explicit lists, crystallographic operations).
pub trait SymmetryProvider {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError>;
}

impl SymmetryProvider for PermutationGroup {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        if self.degree() != sublattice.len() {
            return Err(SymmetryError::LengthMismatch {
                expected: sublattice.len(),
                found: self.degree(),
            });
        }
        Ok(self.clone())
    }
}

/// No symmetry: every labeling is its own class.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialGroup;

impl SymmetryProvider for TrivialGroup {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        Ok(PermutationGroup::trivial(sublattice.len()))
    }
}

/// Sites on a ring, equivalent under rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclicGroup;

impl SymmetryProvider for CyclicGroup {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        Ok(PermutationGroup::cyclic(sublattice.len()))
    }
}

/// Sites on a ring, equivalent under rotation and reflection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DihedralGroup;

impl SymmetryProvider for DihedralGroup {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        Ok(PermutationGroup::dihedral(sublattice.len()))
    }
}

/// An explicit list of permutations, validated and closed under composition.
#[derive(Debug, Clone, Default)]
pub struct ExplicitPermutations {
    pub maps: Vec<Vec<usize>>,
}

impl SymmetryProvider for ExplicitPermutations {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        PermutationGroup::from_permutations(sublattice.len(), self.maps.iter().cloned())
    }
}

/// The group generated by a few generator permutations.
#[derive(Debug, Clone)]
pub struct GeneratedGroup {
    pub generators: Vec<Vec<usize>>,
    pub max_order: usize,
}

impl GeneratedGroup {
    pub fn new(generators: Vec<Vec<usize>>) -> Self {
        Self {
            generators,
            max_order: DEFAULT_MAX_ORDER,
        }
    }
}

impl SymmetryProvider for GeneratedGroup {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        PermutationGroup::generate(
            sublattice.len(),
            self.generators.iter().cloned(),
            self.max_order,
        )
    }
}

/// A space-group operation in fractional coordinates: `r' = R r + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl SymmetryOperation {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Builds an operation from a row-major rotation matrix and a translation vector.
    pub fn from_rows(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        let [r0, r1, r2] = rotation;
        Self::new(
            Matrix3::new(
                r0[0], r0[1], r0[2], r1[0], r1[1], r1[2], r2[0], r2[1], r2[2],
            ),
            Vector3::from(translation),
        )
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    pub fn apply(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * frac + self.translation
    }
}

/// Maps crystallographic operations onto sublattice permutations.
///
/// `site_coords` holds fractional coordinates indexed by parent site; only the sublattice's
/// sites are matched. Each mapped position is wrapped into the unit cell and matched to the
/// nearest sublattice site under periodic boundary conditions; a match farther than
/// `symprec * 10` is an error. Duplicate permutations are dropped.
#[derive(Debug, Clone)]
pub struct CrystalSymmetry {
    pub site_coords: Vec<Vector3<f64>>,
    pub operations: Vec<SymmetryOperation>,
    pub symprec: f64,
}

impl CrystalSymmetry {
    fn sublattice_coords(&self, sublattice: &Sublattice) -> Result<Vec<Vector3<f64>>, SymmetryError> {
        sublattice
            .parent_sites()
            .iter()
            .map(|&parent| {
                self.site_coords
                    .get(parent)
                    .copied()
                    .ok_or(SymmetryError::MissingCoordinates(parent))
            })
            .collect()
    }

    fn match_site(
        frac: &[Vector3<f64>],
        target: &Vector3<f64>,
        tolerance_sq: f64,
        operation: usize,
        site: usize,
    ) -> Result<usize, SymmetryError> {
        let wrapped = target.map(|x| x.rem_euclid(1.0));
        let mut best = (usize::MAX, f64::INFINITY);
        for (idx, coord) in frac.iter().enumerate() {
            let d = (coord - wrapped).map(|x| x - x.round());
            let dist_sq = d.norm_squared();
            if dist_sq < best.1 {
                best = (idx, dist_sq);
            }
        }
        if best.1 > tolerance_sq {
            return Err(SymmetryError::UnmatchedSite {
                operation,
                site,
                distance_sq: best.1,
            });
        }
        Ok(best.0)
    }
}

impl SymmetryProvider for CrystalSymmetry {
    fn permutations(&self, sublattice: &Sublattice) -> Result<PermutationGroup, SymmetryError> {
        let frac = self.sublattice_coords(sublattice)?;
        let tolerance_sq = (self.symprec * SYMPREC_MATCH_FACTOR).powi(2);

        let mut maps = Vec::with_capacity(self.operations.len());
        for (op_idx, op) in self.operations.iter().enumerate() {
            let map = frac
                .iter()
                .enumerate()
                .map(|(site, coord)| {
                    Self::match_site(&frac, &op.apply(coord), tolerance_sq, op_idx, site)
                })
                .collect::<Result<Vec<_>, _>>()?;
            maps.push(map);
        }

        let group = PermutationGroup::from_permutations(sublattice.len(), maps)?;
        debug!(
            operations = self.operations.len(),
            unique_permutations = group.order(),
            "Mapped symmetry operations onto sublattice."
        );
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_net() -> (Sublattice, Vec<Vector3<f64>>) {
        let coords = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.25, 0.25, 0.0),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(0.75, 0.25, 0.0),
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.5, 0.5, 0.0),
        ];
        // Parent sites 1 and 3 are spectators; the sublattice is the 2x2 net of the others.
        let sublattice = Sublattice::new(vec![0, 2, 4, 5]).unwrap();
        (sublattice, coords)
    }

    #[test]
    fn translations_map_to_site_permutations() {
        let (sublattice, coords) = square_net();
        let provider = CrystalSymmetry {
            site_coords: coords,
            operations: vec![
                SymmetryOperation::identity(),
                SymmetryOperation::new(Matrix3::identity(), Vector3::new(0.5, 0.0, 0.0)),
                SymmetryOperation::new(Matrix3::identity(), Vector3::new(0.0, 0.5, 0.0)),
                SymmetryOperation::new(Matrix3::identity(), Vector3::new(1.0, 0.0, 0.0)),
            ],
            symprec: 1e-3,
        };

        let group = provider.permutations(&sublattice).unwrap();
        assert_eq!(group.order(), 4);
        assert_eq!(group.elements()[1].as_slice(), &[1, 0, 3, 2]);
        assert_eq!(group.elements()[2].as_slice(), &[2, 3, 0, 1]);
        // The diagonal translation is not listed but follows from the other two.
        assert_eq!(group.elements()[3].as_slice(), &[3, 2, 1, 0]);
        assert!(group.is_closed());
    }

    #[test]
    fn small_coordinate_noise_is_tolerated() {
        let (sublattice, coords) = square_net();
        let provider = CrystalSymmetry {
            site_coords: coords,
            operations: vec![SymmetryOperation::new(
                Matrix3::identity(),
                Vector3::new(0.5 + 2e-3, -1e-3, 0.0),
            )],
            symprec: 1e-3,
        };
        let group = provider.permutations(&sublattice).unwrap();
        assert_eq!(group.order(), 2);
    }

    #[test]
    fn unmatched_image_is_an_error() {
        let (sublattice, coords) = square_net();
        let provider = CrystalSymmetry {
            site_coords: coords,
            operations: vec![SymmetryOperation::new(
                Matrix3::identity(),
                Vector3::new(0.25, 0.0, 0.0),
            )],
            symprec: 1e-3,
        };
        assert!(matches!(
            provider.permutations(&sublattice),
            Err(SymmetryError::UnmatchedSite { operation: 0, .. })
        ));
    }

    #[test]
    fn missing_coordinates_are_reported() {
        let sublattice = Sublattice::new(vec![0, 7]).unwrap();
        let provider = CrystalSymmetry {
            site_coords: vec![Vector3::zeros()],
            operations: vec![SymmetryOperation::identity()],
            symprec: 1e-3,
        };
        assert_eq!(
            provider.permutations(&sublattice),
            Err(SymmetryError::MissingCoordinates(7))
        );
    }

    #[test]
    fn group_provider_checks_degree() {
        let sublattice = Sublattice::contiguous(4).unwrap();
        let group = PermutationGroup::cyclic(3);
        assert!(matches!(
            group.permutations(&sublattice),
            Err(SymmetryError::LengthMismatch { .. })
        ));
        assert_eq!(
            PermutationGroup::cyclic(4).permutations(&sublattice).unwrap().order(),
            4
        );
    }

    #[test]
    fn generated_and_explicit_providers_build_groups() {
        let sublattice = Sublattice::contiguous(4).unwrap();
        let generated = GeneratedGroup::new(vec![vec![1, 2, 3, 0]])
            .permutations(&sublattice)
            .unwrap();
        assert_eq!(generated.order(), 4);

        let explicit = ExplicitPermutations {
            maps: vec![vec![1, 0, 2, 3]],
        }
        .permutations(&sublattice)
        .unwrap();
        assert_eq!(explicit.order(), 2);

        let rotation_only = ExplicitPermutations {
            maps: vec![vec![1, 2, 3, 0]],
        }
        .permutations(&sublattice)
        .unwrap();
        assert_eq!(rotation_only.order(), 4);
        assert!(rotation_only.is_closed());

        assert_eq!(DihedralGroup.permutations(&sublattice).unwrap().order(), 8);
        assert_eq!(TrivialGroup.permutations(&sublattice).unwrap().order(), 1);
        assert_eq!(CyclicGroup.permutations(&sublattice).unwrap().order(), 4);
    }
}
