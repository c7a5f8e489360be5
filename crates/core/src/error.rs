use std::fmt;

use thiserror::Error;

use crate::types::Metric;

pub type RfmResult<T> = Result<T, RfmError>;

/// Stage of the batch run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configure,
    Load,
    Derive,
    Score,
    Classify,
    Export,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Configure => "configure",
            PipelineStage::Load => "load",
            PipelineStage::Derive => "derive",
            PipelineStage::Score => "score",
            PipelineStage::Classify => "classify",
            PipelineStage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RfmError {
    #[error("Missing field `{field}` for customer {customer_id}")]
    MissingField {
        customer_id: String,
        field: &'static str,
    },

    #[error(
        "Degenerate binning on {metric}: {population} customers produced {non_empty_buckets} \
         non-empty buckets, expected {expected}"
    )]
    DegenerateBinning {
        metric: Metric,
        population: usize,
        non_empty_buckets: usize,
        expected: usize,
    },

    #[error("No segment rule matches rf_code {code:?}")]
    UnmappedCode { code: String },

    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error during {stage}: {message}")]
    Csv {
        stage: PipelineStage,
        message: String,
    },
}

impl RfmError {
    /// The pipeline stage the error surfaced in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            RfmError::MissingField { .. } => PipelineStage::Derive,
            RfmError::DegenerateBinning { .. } => PipelineStage::Score,
            RfmError::UnmappedCode { .. } => PipelineStage::Classify,
            RfmError::InvalidRecord { .. } => PipelineStage::Load,
            RfmError::Config(_) => PipelineStage::Configure,
            RfmError::Csv { stage, .. } => *stage,
        }
    }
}
