//! Descriptive statistics over raw order records — column profiles, channel
//! breakdown and top-N rankings.

use std::collections::HashMap;

use rfm_core::types::{CustomerMetrics, OrderRecord};
use serde::{Deserialize, Serialize};

/// Percentiles reported for every numeric column.
pub const PROFILE_PERCENTILES: [f64; 5] = [0.0, 0.05, 0.50, 0.95, 0.99];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    /// `(percentile, value)` pairs for [`PROFILE_PERCENTILES`].
    pub percentiles: Vec<(f64, f64)>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub channel: String,
    pub customers: usize,
    pub mean_value_total: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    Monetary,
    Frequency,
}

pub fn describe(records: &[OrderRecord]) -> DatasetProfile {
    let columns: [(&str, fn(&OrderRecord) -> Option<f64>); 6] = [
        ("order_num_total_online", |r| r.order_num_total_online.map(|v| v as f64)),
        ("order_num_total_offline", |r| r.order_num_total_offline.map(|v| v as f64)),
        ("value_total_online", |r| r.value_total_online),
        ("value_total_offline", |r| r.value_total_offline),
        ("order_num_total", order_total),
        ("customer_value_total", value_total),
    ];

    DatasetProfile {
        rows: records.len(),
        columns: columns
            .iter()
            .map(|(name, extract)| {
                let values: Vec<Option<f64>> = records.iter().map(extract).collect();
                column_stats(name, &values)
            })
            .collect(),
    }
}

/// Customer count and mean total value per `order_channel`, largest first.
/// Rows without a channel are grouped under `"unknown"`.
pub fn channel_breakdown(records: &[OrderRecord]) -> Vec<ChannelStats> {
    let mut groups: HashMap<&str, (usize, f64, usize)> = HashMap::new();
    for record in records {
        let channel = record.order_channel.as_deref().unwrap_or("unknown");
        let entry = groups.entry(channel).or_insert((0, 0.0, 0));
        entry.0 += 1;
        if let Some(value) = value_total(record) {
            entry.1 += value;
            entry.2 += 1;
        }
    }

    let mut stats: Vec<ChannelStats> = groups
        .into_iter()
        .map(|(channel, (customers, sum, valued))| ChannelStats {
            channel: channel.to_string(),
            customers,
            mean_value_total: (valued > 0).then(|| sum / valued as f64),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.customers
            .cmp(&a.customers)
            .then_with(|| a.channel.cmp(&b.channel))
    });
    stats
}

/// The `n` highest customers by the chosen metric; ties keep input order.
pub fn top_customers(metrics: &[CustomerMetrics], by: RankBy, n: usize) -> Vec<CustomerMetrics> {
    let mut ranked: Vec<&CustomerMetrics> = metrics.iter().collect();
    match by {
        RankBy::Monetary => ranked.sort_by(|a, b| b.monetary.total_cmp(&a.monetary)),
        RankBy::Frequency => ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency)),
    }
    ranked.into_iter().take(n).cloned().collect()
}

fn order_total(record: &OrderRecord) -> Option<f64> {
    Some((record.order_num_total_online? + record.order_num_total_offline?) as f64)
}

fn value_total(record: &OrderRecord) -> Option<f64> {
    Some(record.value_total_online? + record.value_total_offline?)
}

fn column_stats(column: &str, values: &[Option<f64>]) -> ColumnStats {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let missing = values.len() - present.len();
    present.sort_by(f64::total_cmp);

    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    // sample standard deviation
    let std = mean.filter(|_| count > 1).map(|m| {
        let var = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    });
    let percentiles = if count > 0 {
        PROFILE_PERCENTILES
            .iter()
            .map(|&q| (q, percentile(&present, q)))
            .collect()
    } else {
        Vec::new()
    };

    ColumnStats {
        column: column.to_string(),
        count,
        missing,
        mean,
        std,
        min: present.first().copied(),
        percentiles,
        max: present.last().copied(),
    }
}

/// Linear-interpolated percentile of a non-empty sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}
