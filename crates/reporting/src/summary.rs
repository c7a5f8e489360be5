//! Per-segment summary of a segmented batch.

use std::collections::HashMap;

use rfm_core::types::{Segment, SegmentedCustomer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub share: f64,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

#[derive(Default)]
struct Totals {
    customers: usize,
    recency: f64,
    frequency: f64,
    monetary: f64,
}

/// One row per populated segment, in rule-table order.
pub fn segment_summary(customers: &[SegmentedCustomer]) -> Vec<SegmentSummary> {
    let mut totals: HashMap<Segment, Totals> = HashMap::new();
    for customer in customers {
        let metrics = &customer.scored.metrics;
        let entry = totals.entry(customer.segment).or_default();
        entry.customers += 1;
        entry.recency += metrics.recency as f64;
        entry.frequency += metrics.frequency as f64;
        entry.monetary += metrics.monetary;
    }

    let population = customers.len() as f64;
    Segment::ALL
        .iter()
        .filter_map(|segment| {
            let t = totals.get(segment)?;
            let n = t.customers as f64;
            Some(SegmentSummary {
                segment: *segment,
                customers: t.customers,
                share: n / population,
                mean_recency: t.recency / n,
                mean_frequency: t.frequency / n,
                mean_monetary: t.monetary / n,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfm_core::types::{CustomerMetrics, ScoredCustomer};

    fn customer(id: &str, recency: i64, frequency: u64, monetary: f64, segment: Segment) -> SegmentedCustomer {
        SegmentedCustomer {
            scored: ScoredCustomer::new(
                CustomerMetrics {
                    customer_id: id.to_string(),
                    recency,
                    frequency,
                    monetary,
                },
                1,
                1,
                1,
            ),
            segment,
        }
    }

    #[test]
    fn test_summary_means_and_order() {
        let customers = vec![
            customer("a", 10, 2, 100.0, Segment::Champions),
            customer("b", 300, 1, 20.0, Segment::Hibernating),
            customer("c", 20, 6, 300.0, Segment::Champions),
            customer("d", 250, 1, 40.0, Segment::Hibernating),
        ];
        let summary = segment_summary(&customers);
        assert_eq!(summary.len(), 2);

        assert_eq!(summary[0].segment, Segment::Hibernating);
        assert_eq!(summary[0].customers, 2);
        assert!((summary[0].mean_recency - 275.0).abs() < 1e-9);

        assert_eq!(summary[1].segment, Segment::Champions);
        assert!((summary[1].share - 0.5).abs() < 1e-9);
        assert!((summary[1].mean_frequency - 4.0).abs() < 1e-9);
        assert!((summary[1].mean_monetary - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        assert!(segment_summary(&[]).is_empty());
    }
}
