//! Tax and rounding in integer minor units.

use shared_types::Amount;

use super::entities::RoundingPolicy;

const BPS_SCALE: u128 = 10_000;

/// Tax and total for a base amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub tax: Amount,
    pub total: Amount,
}

/// `total = round(amount * (1 + rate))`, `tax = total - amount`.
///
/// Computed exactly in basis-point scaled integers so halves are detected
/// without floating point error.
pub fn quote(amount: Amount, tax_rate_bps: u32, rounding: RoundingPolicy) -> Quote {
    let scaled = u128::from(amount) * (BPS_SCALE + u128::from(tax_rate_bps));
    let total = match rounding {
        RoundingPolicy::Down => scaled / BPS_SCALE,
        RoundingPolicy::Up => scaled.div_ceil(BPS_SCALE),
        RoundingPolicy::Nearest => (scaled + BPS_SCALE / 2) / BPS_SCALE,
    };
    let total = Amount::try_from(total).unwrap_or(Amount::MAX);
    Quote {
        tax: total - amount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_unit_rounding() {
        // 10125 * 1.10 = 11137.5
        assert_eq!(quote(10125, 1000, RoundingPolicy::Nearest).total, 11138);
        assert_eq!(quote(10125, 1000, RoundingPolicy::Up).total, 11138);
        assert_eq!(quote(10125, 1000, RoundingPolicy::Down).total, 11137);
    }

    #[test]
    fn test_exact_amount_is_policy_independent() {
        for policy in [RoundingPolicy::Up, RoundingPolicy::Down, RoundingPolicy::Nearest] {
            let q = quote(10000, 1000, policy);
            assert_eq!(q, Quote { tax: 1000, total: 11000 });
        }
    }

    #[test]
    fn test_zero_rate() {
        assert_eq!(quote(4321, 0, RoundingPolicy::Up), Quote { tax: 0, total: 4321 });
    }

    #[test]
    fn test_nearest_below_half_rounds_down() {
        // 10124 * 1.10 = 11136.4
        assert_eq!(quote(10124, 1000, RoundingPolicy::Nearest).total, 11136);
        assert_eq!(quote(10124, 1000, RoundingPolicy::Up).total, 11137);
    }
}
