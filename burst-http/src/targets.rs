use rand::Rng;

use crate::config::validate_bounds;
use crate::error::Result;

/// Builds `count` request targets of the form `{base_url}/{n}` with `n`
/// drawn uniformly from `lower_bound..upper_bound`.
pub fn generate_targets<R>(
    count: usize,
    lower_bound: u64,
    upper_bound: u64,
    base_url: &str,
    rng: &mut R,
) -> Result<Vec<String>>
where
    R: Rng + ?Sized,
{
    validate_bounds(lower_bound, upper_bound)?;
    Ok(sample_targets(count, lower_bound, upper_bound, base_url, rng))
}

/// Bounds must already be validated.
pub(crate) fn sample_targets<R>(
    count: usize,
    lower_bound: u64,
    upper_bound: u64,
    base_url: &str,
    rng: &mut R,
) -> Vec<String>
where
    R: Rng + ?Sized,
{
    (0..count)
        .map(|_| format!("{base_url}/{}", rng.random_range(lower_bound..upper_bound)))
        .collect()
}
