//! CSV order-record loader.
//!
//! Expected columns (extra columns are ignored):
//!   master_id, order_channel, last_order_channel, first_order_date,
//!   last_order_date, order_num_total_ever_online, order_num_total_ever_offline,
//!   customer_value_total_ever_offline, customer_value_total_ever_online,
//!   interested_in_categories_12
//!
//! Empty cells are kept as `None`; deciding whether an absent value is an
//! error belongs to the metric deriver.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rfm_core::error::{PipelineStage, RfmError, RfmResult};
use rfm_core::types::OrderRecord;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RawOrderRow {
    master_id: String,
    #[serde(default)]
    order_channel: Option<String>,
    #[serde(default)]
    last_order_channel: Option<String>,
    #[serde(default)]
    first_order_date: Option<String>,
    #[serde(default)]
    last_order_date: Option<String>,
    #[serde(default)]
    order_num_total_ever_online: Option<String>,
    #[serde(default)]
    order_num_total_ever_offline: Option<String>,
    #[serde(default)]
    customer_value_total_ever_offline: Option<String>,
    #[serde(default)]
    customer_value_total_ever_online: Option<String>,
    #[serde(default)]
    interested_in_categories_12: Option<String>,
}

impl RawOrderRow {
    fn into_record(self, line: usize) -> RfmResult<OrderRecord> {
        let invalid = |reason: String| RfmError::InvalidRecord { line, reason };

        if self.master_id.is_empty() {
            return Err(invalid("empty master_id".to_string()));
        }

        Ok(OrderRecord {
            first_order_date: parse_opt(self.first_order_date, parse_date)
                .map_err(|e| invalid(format!("first_order_date: {e}")))?,
            last_order_date: parse_opt(self.last_order_date, parse_date)
                .map_err(|e| invalid(format!("last_order_date: {e}")))?,
            order_num_total_online: parse_opt(self.order_num_total_ever_online, parse_count)
                .map_err(|e| invalid(format!("order_num_total_ever_online: {e}")))?,
            order_num_total_offline: parse_opt(self.order_num_total_ever_offline, parse_count)
                .map_err(|e| invalid(format!("order_num_total_ever_offline: {e}")))?,
            value_total_online: parse_opt(self.customer_value_total_ever_online, parse_amount)
                .map_err(|e| invalid(format!("customer_value_total_ever_online: {e}")))?,
            value_total_offline: parse_opt(self.customer_value_total_ever_offline, parse_amount)
                .map_err(|e| invalid(format!("customer_value_total_ever_offline: {e}")))?,
            category_interest_tags: self
                .interested_in_categories_12
                .as_deref()
                .map(parse_categories)
                .unwrap_or_default(),
            order_channel: self.order_channel.filter(|s| !s.is_empty()),
            last_order_channel: self.last_order_channel.filter(|s| !s.is_empty()),
            customer_id: self.master_id,
        })
    }
}

/// Load order records from a CSV reader.
pub fn load_records<R: Read>(reader: R) -> RfmResult<Vec<OrderRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in csv_reader.deserialize::<RawOrderRow>().enumerate() {
        let line = row + 2;
        let raw = result.map_err(|e| RfmError::InvalidRecord {
            line,
            reason: e.to_string(),
        })?;
        records.push(raw.into_record(line)?);
    }

    info!(rows = records.len(), "Order records loaded");
    Ok(records)
}

/// Load order records from a CSV file path.
pub fn load_records_file(path: &Path) -> RfmResult<Vec<OrderRecord>> {
    let file = std::fs::File::open(path).map_err(|e| RfmError::Csv {
        stage: PipelineStage::Load,
        message: format!("failed to open '{}': {}", path.display(), e),
    })?;
    load_records(file)
}

fn parse_opt<T>(
    cell: Option<String>,
    parse: fn(&str) -> Result<T, String>,
) -> Result<Option<T>, String> {
    match cell.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse(value).map(Some),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time of day.
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .ok_or_else(|| format!("invalid date '{value}'"))
}

/// Order counts are often exported as floats ("4.0").
fn parse_count(value: &str) -> Result<u64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("invalid count '{value}'"))?;
    if !parsed.is_finite() || parsed < 0.0 || parsed.fract() != 0.0 {
        return Err(format!("count must be a non-negative integer, got '{value}'"));
    }
    Ok(parsed as u64)
}

fn parse_amount(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("invalid amount '{value}'"))?;
    if parsed < 0.0 {
        return Err(format!("amount must be non-negative, got '{value}'"));
    }
    Ok(parsed)
}

/// `"[ERKEK, KADIN]"` -> `["ERKEK", "KADIN"]`.
fn parse_categories(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
master_id,order_channel,last_order_channel,first_order_date,last_order_date,last_order_date_online,last_order_date_offline,order_num_total_ever_online,order_num_total_ever_offline,customer_value_total_ever_offline,customer_value_total_ever_online,interested_in_categories_12
cc294636,Android App,Offline,2020-10-30,2021-02-26,2021-02-21,2021-02-26,4.0,1.0,139.99,799.38,[KADIN]
f431bd5a,Android App,Mobile,2017-02-08,2021-02-16,2021-02-16,2020-01-10,19.0,2.0,159.97,1853.58,\"[ERKEK, COCUK, KADIN, AKTIFSPOR]\"
69b69676,Android App,Android App,2019-11-27,2020-11-27 00:00:00,2020-11-27,2019-12-01,3.0,2.0,189.97,395.35,[]
";

    #[test]
    fn test_load_sample_csv() {
        let records = load_records(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.customer_id, "cc294636");
        assert_eq!(first.order_channel.as_deref(), Some("Android App"));
        assert_eq!(first.last_order_date, NaiveDate::from_ymd_opt(2021, 2, 26));
        assert_eq!(first.order_num_total_online, Some(4));
        assert_eq!(first.order_num_total_offline, Some(1));
        assert!((first.value_total_online.unwrap() - 799.38).abs() < 1e-9);
        assert!((first.value_total_offline.unwrap() - 139.99).abs() < 1e-9);
        assert_eq!(first.category_interest_tags, vec!["KADIN"]);

        assert_eq!(
            records[1].category_interest_tags,
            vec!["ERKEK", "COCUK", "KADIN", "AKTIFSPOR"]
        );
        assert_eq!(records[2].last_order_date, NaiveDate::from_ymd_opt(2020, 11, 27));
        assert!(records[2].category_interest_tags.is_empty());
    }

    #[test]
    fn test_empty_cells_stay_absent() {
        let csv_data = "\
master_id,last_order_date,order_num_total_ever_online,order_num_total_ever_offline,customer_value_total_ever_offline,customer_value_total_ever_online
a1,2021-01-01,,1.0,10.0,
";
        let records = load_records(csv_data.as_bytes()).unwrap();
        assert_eq!(records[0].order_num_total_online, None);
        assert_eq!(records[0].value_total_online, None);
        assert_eq!(records[0].order_num_total_offline, Some(1));
    }

    #[test]
    fn test_missing_columns_stay_absent() {
        let csv_data = "master_id,last_order_date\na1,2021-01-01\n";
        let records = load_records(csv_data.as_bytes()).unwrap();
        assert_eq!(records[0].order_num_total_online, None);
        assert!(records[0].category_interest_tags.is_empty());
    }

    #[test]
    fn test_invalid_cells_report_line() {
        let csv_data = "\
master_id,last_order_date,order_num_total_ever_online
a1,2021-01-01,2.0
a2,not-a-date,1.0
";
        match load_records(csv_data.as_bytes()) {
            Err(RfmError::InvalidRecord { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("last_order_date"));
            }
            other => panic!("expected InvalidRecord, got {other:?}"),
        }

        let fractional = "master_id,order_num_total_ever_online\na1,2.5\n";
        assert!(matches!(
            load_records(fractional.as_bytes()),
            Err(RfmError::InvalidRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_records_file(Path::new("/nonexistent/flo.csv")).unwrap_err();
        assert_eq!(err.stage(), PipelineStage::Load);
    }
}
