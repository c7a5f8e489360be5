//! Batch pipeline: records -> metrics -> scores -> segments.

use chrono::NaiveDate;
use rfm_core::config::ScoringConfig;
use rfm_core::error::RfmResult;
use rfm_core::types::{OrderRecord, SegmentedCustomer};
use tracing::info;

use crate::classifier::classify;
use crate::deriver::MetricDeriver;
use crate::scorer::QuantileScorer;

/// Explicit inputs of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub reference_date: NaiveDate,
    pub bucket_count: usize,
}

impl TryFrom<&ScoringConfig> for PipelineConfig {
    type Error = rfm_core::RfmError;

    fn try_from(config: &ScoringConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            reference_date: config.reference_date,
            bucket_count: config.bucket_count,
        })
    }
}

pub struct SegmentationPipeline {
    deriver: MetricDeriver,
    scorer: QuantileScorer,
}

impl SegmentationPipeline {
    /// Fails with `RfmError::Config` when `bucket_count` is not five.
    pub fn new(config: PipelineConfig) -> RfmResult<Self> {
        Ok(Self {
            deriver: MetricDeriver::new(config.reference_date),
            scorer: QuantileScorer::new(config.bucket_count)?,
        })
    }

    /// Run all three stages over the complete batch. Any error aborts the
    /// whole run; no customer is dropped or defaulted.
    pub fn run(&self, records: &[OrderRecord]) -> RfmResult<Vec<SegmentedCustomer>> {
        let customer_metrics = self.deriver.derive(records)?;
        let scored = self.scorer.score(customer_metrics)?;

        let segmented = scored
            .into_iter()
            .map(|customer| {
                let segment = classify(customer.rf_code)?;
                metrics::counter!("rfm.segment_assignments", "segment" => segment.as_str())
                    .increment(1);
                Ok(SegmentedCustomer {
                    scored: customer,
                    segment,
                })
            })
            .collect::<RfmResult<Vec<_>>>()?;

        metrics::counter!("rfm.customers_segmented").increment(segmented.len() as u64);
        info!(customers = segmented.len(), "Segmentation complete");
        Ok(segmented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfm_core::error::{PipelineStage, RfmError};
    use rfm_core::types::Segment;

    fn config() -> PipelineConfig {
        PipelineConfig {
            reference_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            bucket_count: 5,
        }
    }

    fn records(n: usize) -> Vec<OrderRecord> {
        let reference = config().reference_date;
        (0..n)
            .map(|i| OrderRecord {
                customer_id: format!("c-{i:03}"),
                last_order_date: Some(reference - chrono::Duration::days(i as i64 * 7 + 1)),
                order_num_total_online: Some((n - i) as u64),
                order_num_total_offline: Some(1),
                value_total_online: Some(100.0 + i as f64 * 13.0),
                value_total_offline: Some(0.0),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_most_recent_frequent_customer_is_champion() {
        let pipeline = SegmentationPipeline::new(config()).unwrap();
        let out = pipeline.run(&records(10)).unwrap();
        assert_eq!(out.len(), 10);
        // c-000 is the most recent and most frequent
        assert_eq!(out[0].scored.rf_code.to_string(), "55");
        assert_eq!(out[0].segment, Segment::Champions);
        // c-009 is the least recent and least frequent
        assert_eq!(out[9].scored.rf_code.to_string(), "11");
        assert_eq!(out[9].segment, Segment::Hibernating);
    }

    #[test]
    fn test_scoring_config_conversion() {
        let scoring = ScoringConfig::default();
        let converted = PipelineConfig::try_from(&scoring).unwrap();
        assert_eq!(converted, config());

        let bad = ScoringConfig {
            bucket_count: 3,
            ..Default::default()
        };
        assert!(PipelineConfig::try_from(&bad).is_err());
    }

    #[test]
    fn test_hand_built_config_with_bad_bucket_count_is_rejected() {
        for bucket_count in [0, 3] {
            let bad = PipelineConfig {
                bucket_count,
                ..config()
            };
            match SegmentationPipeline::new(bad) {
                Err(err) => {
                    assert!(matches!(err, RfmError::Config(_)));
                    assert_eq!(err.stage(), PipelineStage::Configure);
                }
                Ok(_) => panic!("bucket_count {bucket_count} accepted"),
            }
        }
    }

    #[test]
    fn test_missing_field_aborts_run() {
        let mut input = records(10);
        input[4].value_total_offline = None;
        let err = SegmentationPipeline::new(config())
            .unwrap()
            .run(&input)
            .unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Derive);
    }

    #[test]
    fn test_small_population_aborts_run() {
        let err = SegmentationPipeline::new(config())
            .unwrap()
            .run(&records(4))
            .unwrap_err();
        assert!(matches!(err, RfmError::DegenerateBinning { .. }));
        assert_eq!(err.stage(), PipelineStage::Score);
    }
}
