use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::error::CovenantError;
use crate::types::Money;
use crate::CovenantResult;

fn overflow(field: &str) -> CovenantError {
    CovenantError::invalid(field, "EBITDA values exceed the representable decimal range.")
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[Money]) -> CovenantResult<Decimal> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| overflow("ebitda_values"))?;
    sum.checked_div(Decimal::from(values.len() as i64))
        .ok_or_else(|| overflow("ebitda_values"))
}

/// Sample standard deviation (n - 1 denominator). Zero below two points.
pub fn sample_std_dev(values: &[Money]) -> CovenantResult<Decimal> {
    let n = values.len();
    if n < 2 {
        return Ok(Decimal::ZERO);
    }
    let m = mean(values)?;
    let sum_sq = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| {
            let dev = v.checked_sub(m)?;
            acc.checked_add(dev.checked_mul(dev)?)
        })
        .ok_or_else(|| overflow("ebitda_values"))?;
    let variance = sum_sq
        .checked_div(Decimal::from((n - 1) as i64))
        .ok_or_else(|| overflow("ebitda_values"))?;
    Ok(sqrt_decimal(variance))
}

/// Coefficient of variation in percent: stdev / mean x 100, unrounded.
///
/// The series must be non-empty and non-negative with a positive mean. The
/// ratio is scale-free, so it is computed on the series divided by its
/// largest value and any representable series can be scored.
pub fn coefficient_of_variation_pct(values: &[Money]) -> CovenantResult<Decimal> {
    validate_series(values)?;
    let peak = values.iter().copied().fold(Decimal::ZERO, Decimal::max);
    let scaled = values
        .iter()
        .map(|v| v.checked_div(peak))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| overflow("ebitda_values"))?;
    let m = mean(&scaled)?;
    sample_std_dev(&scaled)?
        .checked_div(m)
        .and_then(|cv| cv.checked_mul(dec!(100)))
        .ok_or_else(|| overflow("ebitda_values"))
}

pub(crate) fn validate_series(values: &[Money]) -> CovenantResult<()> {
    if values.is_empty() {
        return Err(CovenantError::invalid(
            "ebitda_values",
            "At least one EBITDA value is required.",
        ));
    }
    if let Some(idx) = values.iter().position(|v| *v < Decimal::ZERO) {
        return Err(CovenantError::invalid(
            format!("ebitda_values[{idx}]"),
            "EBITDA values cannot be negative.",
        ));
    }
    if values.iter().all(|v| v.is_zero()) {
        return Err(CovenantError::invalid(
            "ebitda_values",
            "Mean EBITDA is zero; volatility is undefined.",
        ));
    }
    Ok(())
}

fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[dec!(10), dec!(20), dec!(30)]).unwrap(), dec!(20));
        assert_eq!(mean(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sample_std_dev() {
        // 2, 4, 4, 4, 5, 5, 7, 9: sum sq dev = 32, / 7
        let values = [
            dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9),
        ];
        let sd = sample_std_dev(&values).unwrap();
        let expected = (dec!(32) / dec!(7)).sqrt().unwrap();
        assert!((sd - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_single_point_has_zero_dispersion() {
        assert_eq!(sample_std_dev(&[dec!(40_000_000)]).unwrap(), Decimal::ZERO);
        assert_eq!(
            coefficient_of_variation_pct(&[dec!(40_000_000)]).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_cv_is_scale_free() {
        let small = [dec!(10), dec!(12), dec!(8)];
        let large = [dec!(10_000_000), dec!(12_000_000), dec!(8_000_000)];
        let a = coefficient_of_variation_pct(&small).unwrap();
        let b = coefficient_of_variation_pct(&large).unwrap();
        assert!((a - b).abs() < dec!(0.000001));
        // stdev 2 / mean 10 = 20%
        assert!((a - dec!(20)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(coefficient_of_variation_pct(&[]).is_err());
    }

    #[test]
    fn test_negative_value_names_index() {
        match coefficient_of_variation_pct(&[dec!(5), dec!(-1)]).unwrap_err() {
            CovenantError::InvalidInput { field, .. } => assert_eq!(field, "ebitda_values[1]"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_all_zero_series_rejected() {
        assert!(coefficient_of_variation_pct(&[Decimal::ZERO, Decimal::ZERO]).is_err());
    }

    #[test]
    fn test_raw_dispersion_overflow_is_an_error() {
        // squared deviation of 3e14 from the mean exceeds Decimal::MAX
        let values = [Decimal::ZERO, dec!(600_000_000_000_000)];
        match sample_std_dev(&values).unwrap_err() {
            CovenantError::InvalidInput { field, .. } => assert_eq!(field, "ebitda_values"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_mean_overflow_is_an_error() {
        assert!(mean(&[Decimal::MAX, Decimal::MAX]).is_err());
    }

    #[test]
    fn test_cv_of_wide_series_is_finite() {
        // stdev = sqrt(2) x 3e14, mean 3e14
        let cv = coefficient_of_variation_pct(&[Decimal::ZERO, dec!(600_000_000_000_000)]).unwrap();
        assert!((cv - dec!(141.4213562)).abs() < dec!(0.0001));
        let huge = coefficient_of_variation_pct(&[dec!(1_000_000), Decimal::MAX]).unwrap();
        assert!(huge > dec!(141) && huge < dec!(142));
    }
}
