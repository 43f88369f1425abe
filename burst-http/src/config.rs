use typed_builder::TypedBuilder;

use crate::error::{Error, Result};

pub const DEFAULT_LOWER_BOUND: u64 = 0;
pub const DEFAULT_UPPER_BOUND: u64 = 1_000_000;

/// What to generate: how many requests on average, over how many seconds,
/// and which numeric suffix range to append to `base_url`.
///
/// ```
/// use burst_http::RateSpec;
///
/// let spec = RateSpec::builder()
///     .base_url("http://localhost:3000/items")
///     .mean_requests(100)
///     .duration_secs(10)
///     .build();
/// assert_eq!(spec.upper_bound, 1_000_000);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct RateSpec {
    #[builder(setter(into))]
    pub base_url: String,
    /// Average number of requests over the whole duration.
    pub mean_requests: u64,
    pub duration_secs: u64,
    #[builder(default = DEFAULT_LOWER_BOUND)]
    pub lower_bound: u64,
    /// Exclusive.
    #[builder(default = DEFAULT_UPPER_BOUND)]
    pub upper_bound: u64,
}

impl RateSpec {
    pub fn validate(&self) -> Result<()> {
        if self.duration_secs == 0 {
            return Err(Error::InvalidArgument(
                "duration must be at least one second".into(),
            ));
        }
        validate_bounds(self.lower_bound, self.upper_bound)
    }

    /// Expected arrivals per one-second bucket.
    pub fn lambda(&self) -> f64 {
        self.mean_requests as f64 / self.duration_secs as f64
    }
}

pub(crate) fn validate_bounds(lower: u64, upper: u64) -> Result<()> {
    if upper <= lower {
        return Err(Error::InvalidArgument(format!(
            "upper bound {upper} must be greater than lower bound {lower}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(duration_secs: u64, lower_bound: u64, upper_bound: u64) -> RateSpec {
        RateSpec::builder()
            .base_url("http://localhost:3000")
            .mean_requests(10)
            .duration_secs(duration_secs)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()
    }

    #[test]
    fn defaults_applied() {
        let spec = RateSpec::builder()
            .base_url("http://localhost:3000")
            .mean_requests(10)
            .duration_secs(5)
            .build();
        assert_eq!(spec.lower_bound, DEFAULT_LOWER_BOUND);
        assert_eq!(spec.upper_bound, DEFAULT_UPPER_BOUND);
        assert_eq!(spec.lambda(), 2.0);
    }

    #[test]
    fn zero_duration_rejected() {
        assert!(matches!(
            spec(0, 0, 10).validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_range_rejected() {
        assert!(spec(1, 5, 5).validate().is_err());
        assert!(spec(1, 6, 5).validate().is_err());
        assert!(spec(1, 0, 1).validate().is_ok());
    }
}
