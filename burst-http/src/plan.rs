//! Request plans: one [`Bucket`] of targets per second of the run.
//!
//! [`PlanBuilder`] samples every arrival count up front, then fills buckets
//! with targets either all at once ([`PlanBuilder::build`]) or one bucket
//! at a time ([`PlanBuilder::buckets`]). Both paths consume the random
//! source in the same order, so the same seed yields the same buckets.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arrival::generate_arrival_counts;
use crate::config::RateSpec;
use crate::error::Result;
use crate::targets::sample_targets;

/// Targets to hit within a single one-second window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bucket {
    pub targets: Vec<String>,
}

impl Bucket {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A whole run, serialized as a JSON array of arrays of URLs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestPlan {
    pub buckets: Vec<Bucket>,
}

impl RequestPlan {
    pub fn total_targets(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }
}

impl FromIterator<Bucket> for RequestPlan {
    fn from_iter<I: IntoIterator<Item = Bucket>>(iter: I) -> Self {
        Self {
            buckets: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RequestPlan {
    type Item = Bucket;
    type IntoIter = std::vec::IntoIter<Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

pub struct PlanBuilder {
    spec: RateSpec,
    rng: StdRng,
}

impl PlanBuilder {
    /// Validates `spec` and seeds from the OS.
    pub fn new(spec: RateSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Validates `spec` and uses a fixed seed, for reproducible plans.
    pub fn seeded(spec: RateSpec, seed: u64) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn from_seed(spec: RateSpec, seed: Option<u64>) -> Result<Self> {
        match seed {
            Some(seed) => Self::seeded(spec, seed),
            None => Self::new(spec),
        }
    }

    /// Materializes every bucket.
    pub fn build(self) -> Result<RequestPlan> {
        Ok(self.buckets()?.collect())
    }

    /// Samples the arrival counts and returns a single-pass producer that
    /// generates each bucket's targets only when it is pulled.
    pub fn buckets(mut self) -> Result<Buckets> {
        let counts =
            generate_arrival_counts(self.spec.mean_requests, self.spec.duration_secs, &mut self.rng)?;
        tracing::debug!(
            "Planned {} requests over {}s",
            counts.iter().sum::<u64>(),
            counts.len()
        );
        Ok(Buckets {
            counts: counts.into_iter(),
            spec: self.spec,
            rng: self.rng,
        })
    }
}

/// Lazy bucket producer returned by [`PlanBuilder::buckets`].
pub struct Buckets {
    counts: std::vec::IntoIter<u64>,
    spec: RateSpec,
    rng: StdRng,
}

impl Iterator for Buckets {
    type Item = Bucket;

    fn next(&mut self) -> Option<Self::Item> {
        let count = self.counts.next()?;
        Some(Bucket::new(sample_targets(
            count as usize,
            self.spec.lower_bound,
            self.spec.upper_bound,
            &self.spec.base_url,
            &mut self.rng,
        )))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.counts.size_hint()
    }
}

impl ExactSizeIterator for Buckets {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::Rng;

    fn spec(mean_requests: u64, duration_secs: u64) -> RateSpec {
        RateSpec::builder()
            .base_url("http://localhost:3000")
            .mean_requests(mean_requests)
            .duration_secs(duration_secs)
            .upper_bound(1_000)
            .build()
    }

    #[test]
    fn bucket_count_matches_duration() {
        let mut rng = StdRng::seed_from_u64(99);
        for i in 0..200 {
            let mean = rng.random_range(0..500);
            let duration = rng.random_range(1..60);
            let plan = PlanBuilder::seeded(spec(mean, duration), i).unwrap().build().unwrap();
            assert_eq!(plan.buckets.len(), duration as usize);
        }
    }

    #[test]
    fn bucket_sizes_match_arrival_counts() {
        let seed = 5;
        let expected = generate_arrival_counts(120, 12, &mut StdRng::seed_from_u64(seed)).unwrap();
        let plan = PlanBuilder::seeded(spec(120, 12), seed).unwrap().build().unwrap();
        let sizes: Vec<u64> = plan.buckets.iter().map(|b| b.len() as u64).collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn lazy_and_eager_agree() {
        let eager = PlanBuilder::seeded(spec(80, 8), 11).unwrap().build().unwrap();
        let lazy: Vec<Bucket> = PlanBuilder::seeded(spec(80, 8), 11)
            .unwrap()
            .buckets()
            .unwrap()
            .collect();
        assert_eq!(eager.buckets, lazy);
    }

    #[test]
    fn lazy_reports_remaining_len() {
        let mut buckets = PlanBuilder::seeded(spec(10, 4), 1).unwrap().buckets().unwrap();
        assert_eq!(buckets.len(), 4);
        buckets.next();
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn zero_mean_gives_empty_buckets() {
        let plan = PlanBuilder::seeded(spec(0, 5), 1).unwrap().build().unwrap();
        assert_eq!(plan.buckets.len(), 5);
        assert!(plan.buckets.iter().all(Bucket::is_empty));
    }

    #[test]
    fn zero_duration_rejected_before_sampling() {
        assert!(matches!(
            PlanBuilder::seeded(spec(10, 0), 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn serializes_as_nested_arrays() {
        let plan: RequestPlan = vec![
            Bucket::new(vec!["http://a/1".into(), "http://a/2".into()]),
            Bucket::default(),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            serde_json::to_string(&plan).unwrap(),
            r#"[["http://a/1","http://a/2"],[]]"#
        );
    }
}
