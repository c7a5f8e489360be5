//! CSV writers for audience id lists and the segmented table.

use std::io::Write;
use std::path::Path;

use rfm_core::error::{PipelineStage, RfmError, RfmResult};
use rfm_core::types::SegmentedCustomer;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct SegmentRow<'a> {
    customer_id: &'a str,
    recency: i64,
    frequency: u64,
    monetary: f64,
    recency_score: u8,
    frequency_score: u8,
    monetary_score: u8,
    rf_code: String,
    segment: &'static str,
}

fn export_error(err: impl std::fmt::Display) -> RfmError {
    RfmError::Csv {
        stage: PipelineStage::Export,
        message: err.to_string(),
    }
}

/// Write a single-column CSV of customer ids under `column`.
pub fn write_ids_to<W: Write>(writer: W, column: &str, ids: &[String]) -> RfmResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([column]).map_err(export_error)?;
    for id in ids {
        csv_writer.write_record([id]).map_err(export_error)?;
    }
    csv_writer.flush().map_err(export_error)?;
    Ok(())
}

pub fn write_ids(path: &Path, column: &str, ids: &[String]) -> RfmResult<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| export_error(format!("failed to create '{}': {}", path.display(), e)))?;
    write_ids_to(file, column, ids)?;
    info!(path = %path.display(), ids = ids.len(), "Id list written");
    Ok(())
}

pub fn write_segments_to<W: Write>(writer: W, customers: &[SegmentedCustomer]) -> RfmResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for customer in customers {
        let scored = &customer.scored;
        csv_writer
            .serialize(SegmentRow {
                customer_id: &scored.metrics.customer_id,
                recency: scored.metrics.recency,
                frequency: scored.metrics.frequency,
                monetary: scored.metrics.monetary,
                recency_score: scored.recency_score,
                frequency_score: scored.frequency_score,
                monetary_score: scored.monetary_score,
                rf_code: scored.rf_code.to_string(),
                segment: customer.segment.as_str(),
            })
            .map_err(export_error)?;
    }
    csv_writer.flush().map_err(export_error)?;
    Ok(())
}

pub fn write_segments(path: &Path, customers: &[SegmentedCustomer]) -> RfmResult<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| export_error(format!("failed to create '{}': {}", path.display(), e)))?;
    write_segments_to(file, customers)?;
    info!(path = %path.display(), customers = customers.len(), "Segmented table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfm_core::types::{CustomerMetrics, ScoredCustomer, Segment};
    use tempfile::tempdir;

    #[test]
    fn test_write_ids_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("woman_ids.csv");
        let ids = vec!["cc294636".to_string(), "f431bd5a".to_string()];

        write_ids(&path, "master_id", &ids).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "master_id\ncc294636\nf431bd5a\n");
    }

    #[test]
    fn test_write_empty_id_list_keeps_header() {
        let mut buffer = Vec::new();
        write_ids_to(&mut buffer, "master_id", &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "master_id\n");
    }

    #[test]
    fn test_write_segments() {
        let metrics = CustomerMetrics {
            customer_id: "c-1".to_string(),
            recency: 10,
            frequency: 5,
            monetary: 150.5,
        };
        let customers = vec![SegmentedCustomer {
            scored: ScoredCustomer::new(metrics, 5, 4, 3),
            segment: Segment::Champions,
        }];

        let mut buffer = Vec::new();
        write_segments_to(&mut buffer, &customers).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("customer_id,recency,frequency,monetary,recency_score,frequency_score,monetary_score,rf_code,segment")
        );
        assert_eq!(lines.next(), Some("c-1,10,5,150.5,5,4,3,54,champions"));
    }

    #[test]
    fn test_write_to_missing_directory_fails_in_export_stage() {
        let err = write_ids(Path::new("/nonexistent/dir/ids.csv"), "master_id", &[]).unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Export);
    }
}
