use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use station_announcer::{
    load_schedule, AnnouncementController, AnnouncementPipeline, AnnouncerConfig, BatchReport,
    PipelineEvent, ProgressSink, Reporter, ScheduleRecord,
};

/// Speak departure announcements for the head of a schedule
#[derive(Debug, Parser)]
#[command(name = "announce", version)]
struct Cli {
    /// JSON array of schedule records
    schedule: PathBuf,

    /// Config file (default: <config dir>/station-announcer/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How many records to announce
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause between announcements in milliseconds
    #[arg(long)]
    gap_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    station_announcer::init_logging();
    let cli = Cli::parse();

    let mut config = AnnouncerConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(batch_size) = cli.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(gap_ms) = cli.gap_ms {
        config.pipeline.gap_ms = gap_ms;
    }
    config.validate().context("Invalid command line options")?;

    let records = load_schedule(&cli.schedule)
        .with_context(|| format!("Failed to load schedule {}", cli.schedule.display()))?;
    print_board(&records);

    let sink: ProgressSink = Arc::new(|event| match event {
        PipelineEvent::Announcement { index, text } => println!("\n[{}] {}\n", index + 1, text),
        PipelineEvent::Finished(outcome) => println!("{}", outcome),
        _ => {}
    });
    let reporter = Reporter::new(sink);

    let pipeline = AnnouncementPipeline::from_config(&config, reporter.clone())
        .context("Failed to set up the announcement pipeline")?;
    let controller = Arc::new(AnnouncementController::new(pipeline, reporter));

    controller
        .start(records)
        .await
        .context("Failed to start announcements")?;

    let stopper = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    match controller.wait().await {
        Some(report) => print_summary(&report),
        None => anyhow::bail!("Announcement task ended without a report"),
    }

    Ok(())
}

fn print_board(records: &[ScheduleRecord]) {
    println!(
        "{:<6} {:<14} {:<28} {:<9} {}",
        "Time", "Train", "Destination", "Platform", "Status"
    );
    for record in records {
        println!(
            "{:<6} {:<14} {:<28} {:<9} {}",
            record.scheduled_time,
            record.identifier,
            record.destination,
            record.platform_text(),
            record.delay_text()
        );
    }
}

fn print_summary(report: &BatchReport) {
    for record in &report.records {
        let mut line = format!("  {}. {}: {}", record.index + 1, record.identifier, record.state);
        if record.degraded {
            line.push_str(" (fallback text)");
        }
        if let Some(reason) = &record.skipped {
            line.push_str(&format!(" (not spoken: {})", reason));
        }
        println!("{}", line);
    }
}
