//! Per-second arrival counts.
//!
//! The mean rate `λ = mean_requests / duration_secs` is turned into
//! `duration_secs` independent Poisson draws. There is no correction
//! towards the requested total: over short runs the realized total drifts
//! from `mean_requests`, which is the burstiness we want to exercise.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::error::{Error, Result};

/// Draws one arrival count per second of the run.
pub fn generate_arrival_counts<R>(
    mean_requests: u64,
    duration_secs: u64,
    rng: &mut R,
) -> Result<Vec<u64>>
where
    R: Rng + ?Sized,
{
    if duration_secs == 0 {
        return Err(Error::InvalidArgument(
            "duration must be at least one second".into(),
        ));
    }

    let lambda = mean_requests as f64 / duration_secs as f64;
    let len = usize::try_from(duration_secs)
        .map_err(|_| Error::InvalidArgument(format!("duration {duration_secs}s is too long")))?;

    // Poisson(0) is degenerate and rejected by rand_distr
    if lambda == 0.0 {
        return Ok(vec![0; len]);
    }

    let poisson = Poisson::new(lambda)
        .map_err(|e| Error::InvalidArgument(format!("rate {lambda}/s is unusable: {e}")))?;

    tracing::debug!("Sampling {len} buckets at {lambda:.3} requests/s");
    Ok((0..len).map(|_| poisson.sample(rng) as u64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn one_count_per_second() {
        let mut rng = StdRng::seed_from_u64(7);
        for duration in 1..50 {
            let counts = generate_arrival_counts(100, duration, &mut rng).unwrap();
            assert_eq!(counts.len(), duration as usize);
        }
    }

    #[test]
    fn zero_duration_is_invalid() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            generate_arrival_counts(10, 0, &mut rng),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_mean_gives_empty_buckets() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = generate_arrival_counts(0, 5, &mut rng).unwrap();
        assert_eq!(counts, vec![0; 5]);
    }

    #[test]
    fn reproducible_with_seed() {
        let a = generate_arrival_counts(50, 20, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate_arrival_counts(50, 20, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empirical_mean_converges() {
        let mut rng = StdRng::seed_from_u64(1234);
        let (mean_requests, duration) = (30, 4);
        let lambda = mean_requests as f64 / duration as f64;

        let mut samples = Vec::with_capacity(20_000);
        while samples.len() < 20_000 {
            samples.extend(generate_arrival_counts(mean_requests, duration, &mut rng).unwrap());
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<u64>() as f64 / n;
        // variance of a Poisson equals its mean
        let std_err = (lambda / n).sqrt();
        assert!(
            (mean - lambda).abs() < 3.0 * std_err,
            "mean {mean:.4} too far from {lambda:.4} (3σ = {:.4})",
            3.0 * std_err
        );
    }
}
