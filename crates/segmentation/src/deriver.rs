//! Metric deriver — one recency/frequency/monetary row per customer.

use std::collections::HashMap;

use chrono::NaiveDate;
use rfm_core::error::{RfmError, RfmResult};
use rfm_core::types::{CustomerMetrics, OrderRecord};
use tracing::{debug, info};

/// Aggregates raw order records into per-customer metrics relative to a
/// fixed reference date.
pub struct MetricDeriver {
    reference_date: NaiveDate,
}

struct Accumulator {
    customer_id: String,
    last_order_date: NaiveDate,
    frequency: u64,
    monetary: f64,
}

impl MetricDeriver {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    /// Derive metrics for every distinct customer. Output order is the order
    /// in which each customer id first appears in `records`.
    ///
    /// Rows for the same customer are combined: counts and values are summed
    /// and the most recent `last_order_date` wins.
    pub fn derive(&self, records: &[OrderRecord]) -> RfmResult<Vec<CustomerMetrics>> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        let mut accumulators: Vec<Accumulator> = Vec::with_capacity(records.len());

        for record in records {
            let last_order_date = require(record, "last_order_date", record.last_order_date)?;
            let orders_online =
                require(record, "order_num_total_online", record.order_num_total_online)?;
            let orders_offline =
                require(record, "order_num_total_offline", record.order_num_total_offline)?;
            let value_online = require_amount(record, "value_total_online", record.value_total_online)?;
            let value_offline =
                require_amount(record, "value_total_offline", record.value_total_offline)?;

            let frequency = orders_online + orders_offline;
            let monetary = value_online + value_offline;

            match index.get(record.customer_id.as_str()) {
                Some(&slot) => {
                    let acc = &mut accumulators[slot];
                    acc.last_order_date = acc.last_order_date.max(last_order_date);
                    acc.frequency += frequency;
                    acc.monetary += monetary;
                }
                None => {
                    index.insert(record.customer_id.as_str(), accumulators.len());
                    accumulators.push(Accumulator {
                        customer_id: record.customer_id.clone(),
                        last_order_date,
                        frequency,
                        monetary,
                    });
                }
            }
        }

        if accumulators.len() < records.len() {
            debug!(
                rows = records.len(),
                customers = accumulators.len(),
                "Merged repeated customer rows"
            );
        }

        let metrics: Vec<CustomerMetrics> = accumulators
            .into_iter()
            .map(|acc| CustomerMetrics {
                customer_id: acc.customer_id,
                recency: (self.reference_date - acc.last_order_date).num_days(),
                frequency: acc.frequency,
                monetary: acc.monetary,
            })
            .collect();

        info!(
            customers = metrics.len(),
            reference_date = %self.reference_date,
            "Customer metrics derived"
        );
        Ok(metrics)
    }
}

fn require<T>(record: &OrderRecord, field: &'static str, value: Option<T>) -> RfmResult<T> {
    value.ok_or_else(|| RfmError::MissingField {
        customer_id: record.customer_id.clone(),
        field,
    })
}

/// A non-finite amount carries no value and is treated as absent.
fn require_amount(record: &OrderRecord, field: &'static str, value: Option<f64>) -> RfmResult<f64> {
    require(record, field, value.filter(|v| v.is_finite()))
}
