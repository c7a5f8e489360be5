//! Campaign audiences — segment plus category-interest selections over a
//! segmented batch.

use std::collections::HashMap;

use rfm_core::config::{AudienceConfig, LabelMatching};
use rfm_core::types::{OrderRecord, Segment, SegmentedCustomer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::predicates::{normalize_label, Candidate, Predicate, PredicateGroup};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceDefinition {
    pub name: String,
    pub output_file: String,
    pub criteria: PredicateGroup,
}

/// Customer ids selected for one audience, in segmented-table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceSelection {
    pub name: String,
    pub output_file: String,
    pub customer_ids: Vec<String>,
}

impl AudienceDefinition {
    /// `segments` and `categories_any` become
    /// `SegmentIn(segments) AND (CategoryContains(c1) OR CategoryContains(c2) ..)`.
    /// An empty list drops that side of the conjunction.
    pub fn from_config(config: &AudienceConfig) -> Self {
        let mut predicates = Vec::new();
        if !config.segments.is_empty() {
            predicates.push(Predicate::SegmentIn {
                labels: config.segments.clone(),
            });
        }

        let mut groups = Vec::new();
        if !config.categories_any.is_empty() {
            groups.push(PredicateGroup::any(
                config
                    .categories_any
                    .iter()
                    .map(|tag| Predicate::CategoryContains { tag: tag.clone() })
                    .collect(),
            ));
        }

        Self {
            name: config.name.clone(),
            output_file: config.output_file.clone(),
            criteria: PredicateGroup::all(predicates, groups),
        }
    }

    /// Segment labels that are not literally one of the produced segment names.
    pub fn nonstandard_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        collect_segment_labels(&self.criteria, &mut labels);
        labels
            .into_iter()
            .filter(|label| label.parse::<Segment>().is_err())
            .collect()
    }
}

fn collect_segment_labels(group: &PredicateGroup, out: &mut Vec<String>) {
    for predicate in &group.predicates {
        if let Predicate::SegmentIn { labels } = predicate {
            out.extend(labels.iter().cloned());
        }
    }
    for sub in &group.groups {
        collect_segment_labels(sub, out);
    }
}

/// Interest tags per customer id, merged across repeated rows.
pub fn category_index(records: &[OrderRecord]) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for record in records {
        let tags = index.entry(record.customer_id.clone()).or_default();
        for tag in &record.category_interest_tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }
    index
}

pub fn select_audience(
    definition: &AudienceDefinition,
    customers: &[SegmentedCustomer],
    tags_by_id: &HashMap<String, Vec<String>>,
    matching: LabelMatching,
) -> AudienceSelection {
    for label in definition.nonstandard_labels() {
        match matching {
            LabelMatching::Exact => warn!(
                audience = %definition.name,
                label = %label,
                "Segment label matches no produced segment under exact matching"
            ),
            LabelMatching::Normalized => warn!(
                audience = %definition.name,
                label = %label,
                normalized = %normalize_label(&label),
                "Segment label differs from produced segment names; comparing normalized"
            ),
        }
    }

    let customer_ids: Vec<String> = customers
        .iter()
        .filter(|customer| {
            let tags = tags_by_id
                .get(customer.customer_id())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let candidate = Candidate {
                segment: customer.segment,
                tags,
            };
            definition.criteria.matches(&candidate, matching)
        })
        .map(|customer| customer.customer_id().to_string())
        .collect();

    info!(
        audience = %definition.name,
        selected = customer_ids.len(),
        "Audience selected"
    );

    AudienceSelection {
        name: definition.name.clone(),
        output_file: definition.output_file.clone(),
        customer_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfm_core::config::TargetingConfig;
    use rfm_core::types::{CustomerMetrics, ScoredCustomer};

    fn customer(id: &str, segment: Segment) -> SegmentedCustomer {
        let metrics = CustomerMetrics {
            customer_id: id.to_string(),
            recency: 1,
            frequency: 1,
            monetary: 1.0,
        };
        SegmentedCustomer {
            scored: ScoredCustomer::new(metrics, 1, 1, 1),
            segment,
        }
    }

    fn tagged(id: &str, tags: &[&str]) -> OrderRecord {
        OrderRecord {
            customer_id: id.to_string(),
            category_interest_tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn batch() -> (Vec<SegmentedCustomer>, HashMap<String, Vec<String>>) {
        let customers = vec![
            customer("a", Segment::Champions),
            customer("b", Segment::LoyalCustomers),
            customer("c", Segment::Champions),
            customer("d", Segment::Hibernating),
            customer("e", Segment::NewCustomers),
            customer("f", Segment::AtRisk),
        ];
        let records = vec![
            tagged("a", &["KADIN", "AKTIFSPOR"]),
            tagged("b", &["KADIN"]),
            tagged("c", &["ERKEK"]),
            tagged("d", &["COCUK"]),
            tagged("e", &["ERKEK", "KADIN"]),
            tagged("f", &["ERKEK"]),
        ];
        (customers, category_index(&records))
    }

    #[test]
    fn test_woman_brand_audience() {
        let (customers, tags) = batch();
        let config = TargetingConfig::default();
        let definition = AudienceDefinition::from_config(&config.audiences[0]);
        let selection = select_audience(&definition, &customers, &tags, LabelMatching::Exact);
        assert_eq!(selection.customer_ids, vec!["a", "b"]);
        assert_eq!(selection.output_file, "woman_ids.csv");
    }

    #[test]
    fn test_legacy_labels_depend_on_matching_mode() {
        let (customers, tags) = batch();
        let config = TargetingConfig::default();
        let definition = AudienceDefinition::from_config(&config.audiences[1]);
        assert_eq!(
            definition.nonstandard_labels(),
            vec!["Hibernating", "New Customers"]
        );

        let exact = select_audience(&definition, &customers, &tags, LabelMatching::Exact);
        assert!(exact.customer_ids.is_empty());

        let normalized =
            select_audience(&definition, &customers, &tags, LabelMatching::Normalized);
        assert_eq!(normalized.customer_ids, vec!["d", "e"]);
    }

    #[test]
    fn test_category_only_audience() {
        let (customers, tags) = batch();
        let definition = AudienceDefinition::from_config(&AudienceConfig {
            name: "men".to_string(),
            output_file: "men.csv".to_string(),
            segments: vec![],
            categories_any: vec!["ERKEK".to_string()],
        });
        let selection = select_audience(&definition, &customers, &tags, LabelMatching::Exact);
        assert_eq!(selection.customer_ids, vec!["c", "e", "f"]);
    }

    #[test]
    fn test_customer_without_tags_is_not_category_matched() {
        let customers = vec![customer("z", Segment::Champions)];
        let definition = AudienceDefinition::from_config(&TargetingConfig::default().audiences[0]);
        let selection =
            select_audience(&definition, &customers, &HashMap::new(), LabelMatching::Exact);
        assert!(selection.customer_ids.is_empty());
    }

    #[test]
    fn test_category_index_merges_rows() {
        let index = category_index(&[
            tagged("a", &["KADIN"]),
            tagged("a", &["KADIN", "ERKEK"]),
        ]);
        assert_eq!(index["a"], vec!["KADIN", "ERKEK"]);
    }
}
