use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use regdelta::client::{AnalyzeClient, AnalyzeConfig, AnalyzeTransport};
use regdelta::diff::detect_section_changes;
use regdelta::streaming::drive;
use regdelta::{ChangeRecord, ChangeSink, StreamError, StreamSummary};

/// Compare two document versions and stream the detected changes.
#[derive(Parser, Debug)]
#[command(name = "compare")]
struct Args {
    /// Previous document version
    old: PathBuf,
    /// New document version
    new: PathBuf,
    /// Base URL of the analysis service. Without it, only the local section
    /// diff is printed (no classification).
    #[arg(long)]
    url: Option<String>,
}

struct PrintSink;

impl ChangeSink for PrintSink {
    fn on_change(&mut self, record: ChangeRecord) {
        println!("{}", record.headline());
        if let Some(summary) = &record.change_summary {
            println!("  {}", summary);
        }
        if let Some(impact) = &record.potential_impact {
            println!("  impact: {}", impact);
        }
        if let Some(error) = &record.error {
            println!("  analysis error: {}", error);
        }
    }

    fn on_complete(&mut self, summary: StreamSummary) {
        println!("{} change(s) detected", summary.records);
        if summary.truncated {
            eprintln!("warning: response ended mid-record; output may be incomplete");
        }
    }

    fn on_error(&mut self, error: &StreamError) {
        eprintln!("stream failed: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let old = std::fs::read_to_string(&args.old)
        .with_context(|| format!("reading {}", args.old.display()))?;
    let new = std::fs::read_to_string(&args.new)
        .with_context(|| format!("reading {}", args.new.display()))?;

    match args.url {
        Some(base_url) => {
            let client = AnalyzeClient::new(AnalyzeConfig {
                base_url,
                ..AnalyzeConfig::default()
            });
            let stream = client.analyze(old, new).await?;
            drive(stream, &mut PrintSink).await?;
        }
        None => {
            let changes = detect_section_changes(&old, &new);
            for change in &changes {
                println!("[{}] section {}", change.change_type, change.section);
            }
            println!("{} change(s) detected", changes.len());
        }
    }
    Ok(())
}
