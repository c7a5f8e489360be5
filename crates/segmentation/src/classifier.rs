//! Segment classifier — maps an rf_code to a segment by the first matching rule.

use std::ops::RangeInclusive;

use rfm_core::error::{RfmError, RfmResult};
use rfm_core::types::{RfCode, Segment};

/// Recency-score range and frequency-score range that select a segment.
#[derive(Debug, Clone)]
pub struct SegmentRule {
    pub recency: RangeInclusive<u8>,
    pub frequency: RangeInclusive<u8>,
    pub segment: Segment,
}

impl SegmentRule {
    const fn new(recency: (u8, u8), frequency: (u8, u8), segment: Segment) -> Self {
        Self {
            recency: RangeInclusive::new(recency.0, recency.1),
            frequency: RangeInclusive::new(frequency.0, frequency.1),
            segment,
        }
    }

    pub fn matches(&self, code: RfCode) -> bool {
        self.recency.contains(&code.recency) && self.frequency.contains(&code.frequency)
    }
}

/// Evaluated top to bottom; the first match wins.
pub const RULES: [SegmentRule; 10] = [
    SegmentRule::new((1, 2), (1, 2), Segment::Hibernating),
    SegmentRule::new((1, 2), (3, 4), Segment::AtRisk),
    SegmentRule::new((1, 2), (5, 5), Segment::CantLoose),
    SegmentRule::new((3, 3), (1, 2), Segment::AboutToSleep),
    SegmentRule::new((3, 3), (3, 3), Segment::NeedAttention),
    SegmentRule::new((3, 4), (4, 5), Segment::LoyalCustomers),
    SegmentRule::new((4, 4), (1, 1), Segment::Promising),
    SegmentRule::new((5, 5), (1, 1), Segment::NewCustomers),
    SegmentRule::new((4, 5), (2, 3), Segment::PotentialLoyalists),
    SegmentRule::new((5, 5), (4, 5), Segment::Champions),
];

pub fn classify(code: RfCode) -> RfmResult<Segment> {
    RULES
        .iter()
        .find(|rule| rule.matches(code))
        .map(|rule| rule.segment)
        .ok_or_else(|| RfmError::UnmappedCode {
            code: code.to_string(),
        })
}

/// Classify a two-character code such as `"41"`.
pub fn classify_code(code: &str) -> RfmResult<Segment> {
    classify(code.parse()?)
}
