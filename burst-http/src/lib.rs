//! Poisson-shaped burst load generation for HTTP endpoints.
//!
//! A [`RateSpec`] is turned into a [`RequestPlan`]: one [`Bucket`] per
//! second, each holding a Poisson-distributed number of targets of the form
//! `{base_url}/{n}`. The [`DispatchEngine`] then fires each bucket all at
//! once, waits for every request in it, and reports the bucket's wall time
//! before moving on to the next one.

pub mod arrival;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod plan;
pub mod report;
pub mod sender;
pub mod store;
pub mod targets;

pub use arrival::generate_arrival_counts;
pub use config::{RateSpec, DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};
pub use dispatch::{BucketResult, CancelHandle, DispatchEngine, RequestOutcome};
pub use error::{Error, RequestFailure, Result};
pub use plan::{Bucket, Buckets, PlanBuilder, RequestPlan};
pub use report::{LatencyStats, RequestMetric, RunAggregate, RunReport};
pub use sender::{HttpSender, RequestSender};
pub use targets::generate_targets;
