use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{RfmError, RfmResult};
use crate::types::SCORE_LEVELS;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `RFM_SEGMENTER__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_reference_date")]
    pub reference_date: NaiveDate,
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMatching {
    /// Literal, case-sensitive comparison.
    Exact,
    /// Lowercase and map spaces/hyphens to underscores before comparing.
    Normalized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetingConfig {
    #[serde(default = "default_label_matching")]
    pub label_matching: LabelMatching,
    #[serde(default = "default_audiences")]
    pub audiences: Vec<AudienceConfig>,
}

/// A campaign audience: customers in any of `segments` who are interested
/// in any of `categories_any`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudienceConfig {
    pub name: String,
    pub output_file: String,
    pub segments: Vec<String>,
    #[serde(default)]
    pub categories_any: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

// Default functions
fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap_or_default()
}
fn default_bucket_count() -> usize {
    SCORE_LEVELS as usize
}
fn default_label_matching() -> LabelMatching {
    LabelMatching::Normalized
}
fn default_audiences() -> Vec<AudienceConfig> {
    vec![
        AudienceConfig {
            name: "woman_brand_launch".to_string(),
            output_file: "woman_ids.csv".to_string(),
            segments: vec!["champions".to_string(), "loyal_customers".to_string()],
            categories_any: vec!["KADIN".to_string()],
        },
        // Labels kept as originally requested by marketing; they only resolve
        // under normalized matching.
        AudienceConfig {
            name: "men_children_discount".to_string(),
            output_file: "mc_ids.csv".to_string(),
            segments: vec!["Hibernating".to_string(), "New Customers".to_string()],
            categories_any: vec!["ERKEK".to_string(), "COCUK".to_string()],
        },
    ]
}
fn default_output_directory() -> String {
    ".".to_string()
}
fn default_id_column() -> String {
    "master_id".to_string()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reference_date: default_reference_date(),
            bucket_count: default_bucket_count(),
        }
    }
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            label_matching: default_label_matching(),
            audiences: default_audiences(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            id_column: default_id_column(),
        }
    }
}

impl ScoringConfig {
    /// The segment rule table is defined over a five-level scale, so any
    /// other bucket count is rejected.
    pub fn validate(&self) -> RfmResult<()> {
        if self.bucket_count != SCORE_LEVELS as usize {
            return Err(RfmError::Config(format!(
                "bucket_count must be {}, got {}",
                SCORE_LEVELS, self.bucket_count
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        // No list separator: it would turn every scalar override into a list,
        // and audience lists sit inside an array of tables env keys cannot reach.
        builder = builder.add_source(
            config::Environment::with_prefix("RFM_SEGMENTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.scoring.reference_date,
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()
        );
        assert_eq!(config.scoring.bucket_count, 5);
        assert_eq!(config.targeting.label_matching, LabelMatching::Normalized);
        assert_eq!(config.targeting.audiences.len(), 2);
        assert_eq!(config.output.id_column, "master_id");
        assert!(config.scoring.validate().is_ok());
    }

    #[test]
    fn test_bucket_count_validation() {
        let scoring = ScoringConfig {
            bucket_count: 4,
            ..Default::default()
        };
        let err = scoring.validate().unwrap_err();
        assert!(matches!(err, RfmError::Config(_)));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rfm.toml");
        std::fs::write(
            &path,
            r#"
[scoring]
reference_date = "2021-06-03"

[targeting]
label_matching = "exact"

[[targeting.audiences]]
name = "vip"
output_file = "vip.csv"
segments = ["champions"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(
            config.scoring.reference_date,
            NaiveDate::from_ymd_opt(2021, 6, 3).unwrap()
        );
        assert_eq!(config.scoring.bucket_count, 5);
        assert_eq!(config.targeting.label_matching, LabelMatching::Exact);
        assert_eq!(config.targeting.audiences.len(), 1);
        assert!(config.targeting.audiences[0].categories_any.is_empty());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(AppConfig::load(Some(path.as_path())).is_err());
    }
}
