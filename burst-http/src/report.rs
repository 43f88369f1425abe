use hdrhistogram::Histogram;
use karga::{Aggregate, Metric, Report};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dispatch::BucketResult;

// A failed request carries no latency worth recording
#[derive(Clone, PartialEq, PartialOrd)]
pub enum RequestMetric {
    Success(Duration),
    Failure,
}

impl Metric for RequestMetric {}

/// Running totals over every request and bucket of a run.
#[derive(Clone)]
pub struct RunAggregate {
    pub latency_hist: Histogram<u64>,
    pub count: u64,
    pub failure_count: u64,
    pub buckets: u64,
    /// Sum of per-bucket elapsed times.
    pub bucket_time: Duration,
    /// Set by the engine when the run ends.
    pub wall_time: Duration,
}

impl RunAggregate {
    pub fn record_bucket(&mut self, result: &BucketResult) {
        for outcome in &result.outcomes {
            self.consume(&outcome.metric());
        }
        self.buckets += 1;
        self.bucket_time += result.elapsed;
    }
}

impl Aggregate for RunAggregate {
    type Metric = RequestMetric;

    fn new() -> Self {
        Self {
            latency_hist: Histogram::new(3).expect("Create histogram"),
            count: 0,
            failure_count: 0,
            buckets: 0,
            bucket_time: Duration::ZERO,
            wall_time: Duration::ZERO,
        }
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric {
            RequestMetric::Success(latency) => {
                let res = self.latency_hist.record(latency.as_nanos() as u64);
                if let Err(res) = res {
                    tracing::warn!("Ignoring latency reading due to error: {res}");
                }
            }
            RequestMetric::Failure => self.failure_count += 1,
        };
        self.count += 1;
    }

    fn merge(&mut self, other: Self) {
        self.latency_hist += other.latency_hist;
        self.count += other.count;
        self.failure_count += other.failure_count;
        self.buckets += other.buckets;
        self.bucket_time += other.bucket_time;
        self.wall_time += other.wall_time;
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LatencyStats {
    pub avg: Duration,
    pub min: Duration,
    pub med: Duration,
    pub max: Duration,
    pub p90: Duration,
    pub p95: Duration,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RunReport {
    pub req_duration: LatencyStats,
    pub reqs_total: u64,
    pub reqs_failed: u64,
    /// Percentage of failed requests.
    pub req_failure_ratio: f64,
    pub buckets: u64,
    pub avg_bucket_time: Duration,
    pub wall_time: Duration,
}

impl From<RunAggregate> for RunReport {
    fn from(value: RunAggregate) -> Self {
        let hist = &value.latency_hist;
        let req_duration = LatencyStats {
            avg: Duration::from_nanos(hist.mean() as u64),
            min: Duration::from_nanos(hist.min()),
            med: Duration::from_nanos(hist.value_at_quantile(0.5)),
            max: Duration::from_nanos(hist.max()),
            p90: Duration::from_nanos(hist.value_at_quantile(0.90)),
            p95: Duration::from_nanos(hist.value_at_quantile(0.95)),
        };

        let req_failure_ratio = if value.count == 0 {
            0.0
        } else {
            (value.failure_count as f64 / value.count as f64) * 100.0
        };
        let avg_bucket_time = match u32::try_from(value.buckets) {
            Ok(n) if n > 0 => value.bucket_time / n,
            _ => Duration::ZERO,
        };

        Self {
            req_duration,
            reqs_total: value.count,
            reqs_failed: value.failure_count,
            req_failure_ratio,
            buckets: value.buckets,
            avg_bucket_time,
            wall_time: value.wall_time,
        }
    }
}

impl Report<RunAggregate> for RunReport {}
