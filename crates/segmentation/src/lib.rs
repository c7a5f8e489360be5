//! RFM scoring and segmentation: metric derivation, quantile scoring and
//! rule-table classification over a complete batch of order records.

pub mod classifier;
pub mod deriver;
pub mod pipeline;
pub mod scorer;

pub use classifier::{classify, classify_code};
pub use deriver::MetricDeriver;
pub use pipeline::{PipelineConfig, SegmentationPipeline};
pub use scorer::QuantileScorer;
