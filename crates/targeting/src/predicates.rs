//! Predicate types and evaluation logic for audience criteria.
//!
//! Groups nest explicitly, so `A AND (B OR C)` is always written as an `And`
//! group holding `A` and an `Or` sub-group; there is no operator precedence.

use rfm_core::config::LabelMatching;
use rfm_core::types::Segment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateGroup {
    pub operator: LogicalOperator,
    pub predicates: Vec<Predicate>,
    pub groups: Vec<PredicateGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Customer's segment equals one of `labels`.
    SegmentIn { labels: Vec<String> },
    /// Any interest tag of the customer contains `tag` as a substring.
    CategoryContains { tag: String },
}

/// The attributes of a customer that predicates can see.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub segment: Segment,
    pub tags: &'a [String],
}

impl PredicateGroup {
    pub fn all(predicates: Vec<Predicate>, groups: Vec<PredicateGroup>) -> Self {
        Self {
            operator: LogicalOperator::And,
            predicates,
            groups,
        }
    }

    pub fn any(predicates: Vec<Predicate>) -> Self {
        Self {
            operator: LogicalOperator::Or,
            predicates,
            groups: Vec::new(),
        }
    }

    /// An empty `And` group matches everything; an empty `Or` group matches nothing.
    pub fn matches(&self, candidate: &Candidate<'_>, matching: LabelMatching) -> bool {
        match self.operator {
            LogicalOperator::And => {
                self.predicates
                    .iter()
                    .all(|p| p.evaluate(candidate, matching))
                    && self.groups.iter().all(|g| g.matches(candidate, matching))
            }
            LogicalOperator::Or => {
                self.predicates
                    .iter()
                    .any(|p| p.evaluate(candidate, matching))
                    || self.groups.iter().any(|g| g.matches(candidate, matching))
            }
        }
    }
}

impl Predicate {
    pub fn evaluate(&self, candidate: &Candidate<'_>, matching: LabelMatching) -> bool {
        match self {
            Predicate::SegmentIn { labels } => labels
                .iter()
                .any(|label| label_matches(label, candidate.segment, matching)),
            Predicate::CategoryContains { tag } => {
                candidate.tags.iter().any(|t| t.contains(tag.as_str()))
            }
        }
    }
}

pub fn label_matches(label: &str, segment: Segment, matching: LabelMatching) -> bool {
    match matching {
        LabelMatching::Exact => label == segment.as_str(),
        LabelMatching::Normalized => normalize_label(label) == segment.as_str(),
    }
}

/// `"New Customers"` -> `"new_customers"`.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
