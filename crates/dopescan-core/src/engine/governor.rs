use super::config::ScreeningConfig;
use super::error::EngineError;
use std::fmt;
use tracing::warn;

/// Exact number of raw labelings, or the fact that it does not fit in 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawCount {
    Exact(u128),
    Overflow,
}

impl RawCount {
    pub fn exceeds(&self, ceiling: u64) -> bool {
        match self {
            RawCount::Exact(count) => *count > u128::from(ceiling),
            RawCount::Overflow => true,
        }
    }

    pub fn exact(&self) -> Option<u128> {
        match self {
            RawCount::Exact(count) => Some(*count),
            RawCount::Overflow => None,
        }
    }
}

impl fmt::Display for RawCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCount::Exact(count) => write!(f, "{count}"),
            RawCount::Overflow => write!(f, "more than {}", u128::MAX),
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// `C(n, k)` with checked arithmetic. Intermediate values never exceed the result times `k`
/// thanks to the gcd reduction, so `None` means the binomial itself overflows.
pub fn binomial(n: usize, k: usize) -> Option<u128> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut result: u128 = 1;
    for i in 1..=k {
        let factor = n - k + i;
        let g = gcd(result, i);
        result = (result / g).checked_mul(factor / (i / g))?;
    }
    Some(result)
}

/// `N! / ∏ count_i!` with `N = Σ count_i`, as a product of binomials.
pub fn multinomial(counts: &[usize]) -> RawCount {
    let mut remaining: usize = counts.iter().sum();
    let mut total: u128 = 1;
    for &count in counts {
        let Some(term) = binomial(remaining, count) else {
            return RawCount::Overflow;
        };
        let Some(product) = total.checked_mul(term) else {
            return RawCount::Overflow;
        };
        total = product;
        remaining -= count;
    }
    RawCount::Exact(total)
}

/// Enforces the combinatorial ceilings of a run.
#[derive(Debug, Clone)]
pub struct SafetyGovernor {
    max_enum: u64,
    max_unique: usize,
    unique_count: usize,
}

impl SafetyGovernor {
    pub fn new(config: &ScreeningConfig) -> Self {
        Self {
            max_enum: config.max_enum,
            max_unique: config.max_unique,
            unique_count: 0,
        }
    }

    /// Fails when the raw count is above `max_enum`. Called before any labeling is generated.
    pub fn check_raw(&self, raw_count: RawCount) -> Result<(), EngineError> {
        if raw_count.exceeds(self.max_enum) {
            warn!(%raw_count, max_enum = self.max_enum, "Raw enumeration ceiling exceeded.");
            return Err(EngineError::EnumerationTooLarge {
                raw_count,
                max_enum: self.max_enum,
            });
        }
        Ok(())
    }

    /// Registers one more unique class; fails once the count goes above `max_unique`.
    pub fn record_unique(&mut self, raw_checked: u64) -> Result<(), EngineError> {
        self.unique_count += 1;
        if self.unique_count > self.max_unique {
            warn!(
                unique = self.unique_count,
                max_unique = self.max_unique,
                raw_checked,
                "Unique configuration ceiling exceeded."
            );
            return Err(EngineError::TooManyUniqueConfigurations {
                unique_count: self.unique_count,
                max_unique: self.max_unique,
                raw_checked,
            });
        }
        Ok(())
    }

    pub fn unique_count(&self) -> usize {
        self.unique_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ScreeningConfigBuilder;

    fn governor(max_enum: u64, max_unique: usize) -> SafetyGovernor {
        let config = ScreeningConfigBuilder::new()
            .topk(1)
            .max_enum(max_enum)
            .max_unique(max_unique)
            .build()
            .unwrap();
        SafetyGovernor::new(&config)
    }

    #[test]
    fn binomial_matches_known_values() {
        assert_eq!(binomial(4, 2), Some(6));
        assert_eq!(binomial(10, 0), Some(1));
        assert_eq!(binomial(10, 10), Some(1));
        assert_eq!(binomial(3, 5), Some(0));
        assert_eq!(binomial(52, 5), Some(2_598_960));
        assert_eq!(binomial(100, 50), Some(100_891_344_545_564_193_334_812_497_256));
    }

    #[test]
    fn binomial_reports_overflow_instead_of_wrapping() {
        assert_eq!(binomial(200, 100), None);
    }

    #[test]
    fn multinomial_is_exact() {
        assert_eq!(multinomial(&[2, 2]), RawCount::Exact(6));
        assert_eq!(multinomial(&[6, 1, 1]), RawCount::Exact(56));
        assert_eq!(multinomial(&[5, 0]), RawCount::Exact(1));
        assert_eq!(multinomial(&[1, 1, 1, 1]), RawCount::Exact(24));
        assert_eq!(multinomial(&[100, 100]), RawCount::Overflow);
    }

    #[test]
    fn raw_ceiling_is_inclusive() {
        let governor = governor(6, 10);
        assert!(governor.check_raw(RawCount::Exact(6)).is_ok());
        let err = governor.check_raw(RawCount::Exact(7)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::EnumerationTooLarge {
                raw_count: RawCount::Exact(7),
                max_enum: 6
            }
        ));
        assert!(governor.check_raw(RawCount::Overflow).is_err());
    }

    #[test]
    fn unique_ceiling_is_inclusive() {
        let mut governor = governor(100, 2);
        assert!(governor.record_unique(1).is_ok());
        assert!(governor.record_unique(2).is_ok());
        let err = governor.record_unique(5).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TooManyUniqueConfigurations {
                unique_count: 3,
                max_unique: 2,
                raw_checked: 5
            }
        ));
    }

    #[test]
    fn overflow_displays_as_lower_bound() {
        assert!(RawCount::Overflow.to_string().starts_with("more than"));
        assert_eq!(RawCount::Exact(42).to_string(), "42");
    }
}
