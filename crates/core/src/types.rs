use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RfmError;

/// Number of ordinal score levels produced by the quantile scorer.
pub const SCORE_LEVELS: u8 = 5;

/// One raw input row. Numeric and date fields are optional so that absent
/// cells survive loading and can be rejected by the metric deriver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderRecord {
    pub customer_id: String,
    pub order_channel: Option<String>,
    pub last_order_channel: Option<String>,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
    pub order_num_total_online: Option<u64>,
    pub order_num_total_offline: Option<u64>,
    pub value_total_online: Option<f64>,
    pub value_total_offline: Option<f64>,
    #[serde(default)]
    pub category_interest_tags: Vec<String>,
}

/// Recency, frequency and monetary value for a single customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the reference date and the last order. May be negative
    /// when the reference date precedes the order.
    pub recency: i64,
    pub frequency: u64,
    pub monetary: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Recency => "recency",
            Metric::Frequency => "frequency",
            Metric::Monetary => "monetary",
        };
        f.write_str(name)
    }
}

/// Two-digit lookup key: recency score followed by frequency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RfCode {
    pub recency: u8,
    pub frequency: u8,
}

impl RfCode {
    pub fn new(recency: u8, frequency: u8) -> Self {
        Self { recency, frequency }
    }

    /// All 25 codes in ascending order, "11" through "55".
    pub fn all() -> impl Iterator<Item = RfCode> {
        (1..=SCORE_LEVELS).flat_map(|r| (1..=SCORE_LEVELS).map(move |f| RfCode::new(r, f)))
    }
}

impl fmt::Display for RfCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.recency, self.frequency)
    }
}

impl FromStr for RfCode {
    type Err = RfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<_>>()
            .unwrap_or_default();
        match digits.as_slice() {
            [r, f] => Ok(RfCode::new(*r, *f)),
            _ => Err(RfmError::UnmappedCode {
                code: s.to_string(),
            }),
        }
    }
}

impl Serialize for RfCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RfCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Customer metrics annotated with the three quantile scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCustomer {
    pub metrics: CustomerMetrics,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rf_code: RfCode,
}

impl ScoredCustomer {
    pub fn new(
        metrics: CustomerMetrics,
        recency_score: u8,
        frequency_score: u8,
        monetary_score: u8,
    ) -> Self {
        Self {
            metrics,
            recency_score,
            frequency_score,
            monetary_score,
            rf_code: RfCode::new(recency_score, frequency_score),
        }
    }
}

/// Marketing cohorts, declared in rule-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoose,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::Hibernating,
        Segment::AtRisk,
        Segment::CantLoose,
        Segment::AboutToSleep,
        Segment::NeedAttention,
        Segment::LoyalCustomers,
        Segment::Promising,
        Segment::NewCustomers,
        Segment::PotentialLoyalists,
        Segment::Champions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Hibernating => "hibernating",
            Segment::AtRisk => "at_risk",
            Segment::CantLoose => "cant_loose",
            Segment::AboutToSleep => "about_to_sleep",
            Segment::NeedAttention => "need_attention",
            Segment::LoyalCustomers => "loyal_customers",
            Segment::Promising => "promising",
            Segment::NewCustomers => "new_customers",
            Segment::PotentialLoyalists => "potential_loyalists",
            Segment::Champions => "champions",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = String;

    /// Exact, case-sensitive match on the produced label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Segment::ALL
            .iter()
            .copied()
            .find(|segment| segment.as_str() == s)
            .ok_or_else(|| format!("unknown segment label: {s}"))
    }
}

/// Final, immutable output row of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedCustomer {
    pub scored: ScoredCustomer,
    pub segment: Segment,
}

impl SegmentedCustomer {
    pub fn customer_id(&self) -> &str {
        &self.scored.metrics.customer_id
    }
}
