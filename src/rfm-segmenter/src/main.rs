//! RFM Segmenter — scores a batch of customer order records, assigns each
//! customer a marketing segment and writes campaign audience id lists.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rfm_core::config::{AppConfig, LabelMatching};
use rfm_core::types::OrderRecord;
use rfm_dataset::{load_records_file, write_ids, write_segments};
use rfm_reporting::{channel_breakdown, describe, segment_summary, top_customers, RankBy};
use rfm_segmentation::{classify_code, MetricDeriver, PipelineConfig, SegmentationPipeline};
use rfm_targeting::{category_index, select_audience, AudienceDefinition};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rfm-segmenter")]
#[command(about = "RFM customer segmentation and campaign audience selection")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "RFM_SEGMENTER_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score and segment customers, then write audience id lists
    Segment {
        /// Input CSV of order records
        #[arg(short, long)]
        input: PathBuf,

        /// Reference date for recency, YYYY-MM-DD (overrides config)
        #[arg(long)]
        reference_date: Option<NaiveDate>,

        /// Directory for audience id lists (overrides config)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also write the full segmented table to this CSV
        #[arg(long)]
        segments_out: Option<PathBuf>,

        /// Compare audience segment labels literally
        #[arg(long, default_value_t = false)]
        exact_labels: bool,
    },

    /// Print descriptive statistics for an input CSV as JSON
    Describe {
        /// Input CSV of order records
        #[arg(short, long)]
        input: PathBuf,

        /// Number of top customers to list
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Reference date for recency, YYYY-MM-DD (overrides config)
        #[arg(long)]
        reference_date: Option<NaiveDate>,
    },

    /// Print the segment for a two-digit rf_code such as 41
    Classify { code: String },
}

#[derive(Debug, Serialize)]
struct SegmentReport {
    reference_date: NaiveDate,
    customers: usize,
    segments: Vec<rfm_reporting::SegmentSummary>,
    audiences: Vec<AudienceReport>,
}

#[derive(Debug, Serialize)]
struct AudienceReport {
    name: String,
    path: PathBuf,
    customers: usize,
}

#[derive(Debug, Serialize)]
struct DescribeReport {
    profile: rfm_reporting::DatasetProfile,
    channels: Vec<rfm_reporting::describe::ChannelStats>,
    top_by_monetary: Vec<rfm_core::types::CustomerMetrics>,
    top_by_frequency: Vec<rfm_core::types::CustomerMetrics>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Segment {
            input,
            reference_date,
            output_dir,
            segments_out,
            exact_labels,
        } => {
            let mut config = config;
            if let Some(date) = reference_date {
                config.scoring.reference_date = date;
            }
            if let Some(dir) = output_dir {
                config.output.directory = dir.display().to_string();
            }
            if exact_labels {
                config.targeting.label_matching = LabelMatching::Exact;
            }
            run_segment(&config, &input, segments_out.as_deref())
        }
        Commands::Describe {
            input,
            top,
            reference_date,
        } => {
            let mut config = config;
            if let Some(date) = reference_date {
                config.scoring.reference_date = date;
            }
            run_describe(&config, &input, top)
        }
        Commands::Classify { code } => {
            let segment = classify_code(&code)?;
            println!("{segment}");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "rfm_segmenter=info,rfm_segmentation=info,rfm_dataset=info,rfm_targeting=info".into()
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config from environment, using defaults");
            AppConfig::default()
        })),
    }
}

fn run_segment(config: &AppConfig, input: &Path, segments_out: Option<&Path>) -> anyhow::Result<()> {
    let pipeline_config = PipelineConfig::try_from(&config.scoring)?;
    info!(
        input = %input.display(),
        reference_date = %pipeline_config.reference_date,
        buckets = pipeline_config.bucket_count,
        label_matching = ?config.targeting.label_matching,
        "Configuration loaded"
    );

    let records = load_records_file(input)?;
    let segmented = SegmentationPipeline::new(pipeline_config)?
        .run(&records)
        .map_err(|e| {
            error!(stage = %e.stage(), error = %e, "Segmentation aborted");
            e
        })?;

    let summary = segment_summary(&segmented);
    for row in &summary {
        info!(
            segment = %row.segment,
            customers = row.customers,
            mean_recency = row.mean_recency,
            mean_frequency = row.mean_frequency,
            mean_monetary = row.mean_monetary,
            "Segment summary"
        );
    }

    if let Some(path) = segments_out {
        write_segments(path, &segmented)?;
    }

    let output_dir = PathBuf::from(&config.output.directory);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let tags = category_index(&records);
    let mut audiences = Vec::with_capacity(config.targeting.audiences.len());
    for audience in &config.targeting.audiences {
        let definition = AudienceDefinition::from_config(audience);
        let selection = select_audience(
            &definition,
            &segmented,
            &tags,
            config.targeting.label_matching,
        );
        let path = output_dir.join(&selection.output_file);
        write_ids(&path, &config.output.id_column, &selection.customer_ids)?;
        audiences.push(AudienceReport {
            name: selection.name,
            path,
            customers: selection.customer_ids.len(),
        });
    }

    let report = SegmentReport {
        reference_date: pipeline_config.reference_date,
        customers: segmented.len(),
        segments: summary,
        audiences,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_describe(config: &AppConfig, input: &Path, top: usize) -> anyhow::Result<()> {
    let records = load_records_file(input)?;
    let report = describe_report(config.scoring.reference_date, &records, top);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Profiles every row, missing cells included. Rankings only cover customers
/// whose rows are all complete.
fn describe_report(
    reference_date: NaiveDate,
    records: &[OrderRecord],
    top: usize,
) -> DescribeReport {
    let incomplete: HashSet<&str> = records
        .iter()
        .filter(|r| !is_complete(r))
        .map(|r| r.customer_id.as_str())
        .collect();
    if !incomplete.is_empty() {
        warn!(
            customers = incomplete.len(),
            "Customers with missing fields left out of top-N rankings"
        );
    }
    let complete: Vec<OrderRecord> = records
        .iter()
        .filter(|r| !incomplete.contains(r.customer_id.as_str()))
        .cloned()
        .collect();

    let metrics = MetricDeriver::new(reference_date)
        .derive(&complete)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Metric derivation failed, rankings omitted");
            Vec::new()
        });

    DescribeReport {
        profile: describe(records),
        channels: channel_breakdown(records),
        top_by_monetary: top_customers(&metrics, RankBy::Monetary, top),
        top_by_frequency: top_customers(&metrics, RankBy::Frequency, top),
    }
}

fn is_complete(record: &OrderRecord) -> bool {
    let finite = |v: Option<f64>| v.is_some_and(f64::is_finite);
    record.last_order_date.is_some()
        && record.order_num_total_online.is_some()
        && record.order_num_total_offline.is_some()
        && finite(record.value_total_online)
        && finite(record.value_total_offline)
}
