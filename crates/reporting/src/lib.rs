//! Segmentation reporting — dataset profiles, channel breakdown, top-N
//! rankings and per-segment summaries.

pub mod describe;
pub mod summary;

pub use describe::{channel_breakdown, describe, top_customers, DatasetProfile, RankBy};
pub use summary::{segment_summary, SegmentSummary};
