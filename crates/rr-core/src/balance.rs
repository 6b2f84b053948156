//! Log-ratio ("balance") computation

use crate::data::AbundanceSource;
use crate::error::Result;

/// `ln(numerator) - ln(denominator)`.
///
/// Returns `NaN` when either operand is zero, negative or NaN: such a sample
/// has no defined balance and is skipped by the views and the exporter.
pub fn log_ratio(numerator: f64, denominator: f64) -> f64 {
    if numerator > 0.0 && denominator > 0.0 {
        numerator.ln() - denominator.ln()
    } else {
        f64::NAN
    }
}

/// Sum of a sample's abundances over a set of features.
///
/// An empty feature set sums to 0. The sample ID is validated even then, so
/// an unknown sample is reported no matter what is selected.
pub fn summed_abundance<'a, I>(source: &dyn AbundanceSource, features: I, sample: &str) -> Result<f64>
where
    I: IntoIterator<Item = &'a str>,
{
    source.validate_sample(sample)?;
    let mut total = 0.0;
    for feature in features {
        total += source.abundance(feature, sample)?;
    }
    Ok(total)
}

/// Balance of one sample given the numerator and denominator feature sets
pub fn sample_balance<'a, N, D>(
    source: &dyn AbundanceSource,
    numerator: N,
    denominator: D,
    sample: &str,
) -> Result<f64>
where
    N: IntoIterator<Item = &'a str>,
    D: IntoIterator<Item = &'a str>,
{
    let top = summed_abundance(source, numerator, sample)?;
    let bot = summed_abundance(source, denominator, sample)?;
    Ok(log_ratio(top, bot))
}
