//! Quantile scorer — equal-population binning of each metric into 1..=5.
//!
//! Bin edges are the 0, 1/n, .., 1 quantiles of the whole population, using
//! linear interpolation between order statistics. Bins are right-closed,
//! `(edge[k-1], edge[k]]`, and the first bin also includes the minimum.
//!
//! Frequency is binned on its first-occurrence rank rather than its raw
//! value: customers are stably sorted by frequency and tied values keep their
//! input order, so every customer gets a distinct position and the bins stay
//! balanced even when most customers share a handful of small counts.

use rfm_core::error::{RfmError, RfmResult};
use rfm_core::types::{CustomerMetrics, Metric, ScoredCustomer, SCORE_LEVELS};
use tracing::{debug, info};

pub struct QuantileScorer {
    buckets: usize,
}

impl QuantileScorer {
    /// The rule table reads scores on a fixed five-level scale; any other
    /// bucket count is a configuration error.
    pub fn new(buckets: usize) -> RfmResult<Self> {
        if buckets != SCORE_LEVELS as usize {
            return Err(RfmError::Config(format!(
                "bucket_count must be {SCORE_LEVELS}, got {buckets}"
            )));
        }
        Ok(Self { buckets })
    }

    /// Score the complete population. Requires every customer up front since
    /// the bin edges depend on all of them.
    pub fn score(&self, metrics: Vec<CustomerMetrics>) -> RfmResult<Vec<ScoredCustomer>> {
        let recency: Vec<f64> = metrics.iter().map(|m| m.recency as f64).collect();
        let frequency: Vec<f64> = metrics.iter().map(|m| m.frequency as f64).collect();
        let monetary: Vec<f64> = metrics.iter().map(|m| m.monetary).collect();

        let recency_buckets = self.bucketize(Metric::Recency, &recency)?;
        let frequency_buckets = self.bucketize(Metric::Frequency, &rank_first(&frequency))?;
        let monetary_buckets = self.bucketize(Metric::Monetary, &monetary)?;

        let top = self.buckets as u8;
        let scored: Vec<ScoredCustomer> = metrics
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                // Smaller recency is better, so its labels run in reverse.
                let recency_score = top + 1 - recency_buckets[i];
                ScoredCustomer::new(m, recency_score, frequency_buckets[i], monetary_buckets[i])
            })
            .collect();

        info!(customers = scored.len(), buckets = self.buckets, "Customers scored");
        Ok(scored)
    }

    /// Assign each value a 1-based bucket, lowest values in bucket 1.
    pub fn bucketize(&self, metric: Metric, values: &[f64]) -> RfmResult<Vec<u8>> {
        if values.len() < self.buckets {
            return Err(RfmError::DegenerateBinning {
                metric,
                population: values.len(),
                non_empty_buckets: count_distinct(values).min(self.buckets),
                expected: self.buckets,
            });
        }

        let edges = quantile_edges(values, self.buckets);
        debug!(metric = %metric, edges = ?edges, "Quantile edges computed");

        let interior = &edges[1..self.buckets];
        let assigned: Vec<u8> = values
            .iter()
            .map(|&v| 1 + interior.iter().filter(|&&edge| v > edge).count() as u8)
            .collect();

        let mut sizes = vec![0usize; self.buckets];
        for &bucket in &assigned {
            sizes[(bucket - 1) as usize] += 1;
        }
        let non_empty = sizes.iter().filter(|&&n| n > 0).count();
        if non_empty < self.buckets {
            return Err(RfmError::DegenerateBinning {
                metric,
                population: values.len(),
                non_empty_buckets: non_empty,
                expected: self.buckets,
            });
        }

        Ok(assigned)
    }
}

/// 1-based ascending rank; equal values are ranked in order of appearance.
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, so ties keep their input order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (position, idx) in order.into_iter().enumerate() {
        ranks[idx] = (position + 1) as f64;
    }
    ranks
}

/// The `buckets + 1` quantile edges of `values`. `values` must not be empty.
pub fn quantile_edges(values: &[f64], buckets: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len() - 1;

    (0..=buckets)
        .map(|k| {
            // position = k / buckets * last, kept exact when it is integral
            let numerator = k * last;
            let lo = numerator / buckets;
            let frac = (numerator % buckets) as f64 / buckets as f64;
            if frac == 0.0 {
                sorted[lo]
            } else {
                sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
            }
        })
        .collect()
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
