mod driver;
mod service;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use driver::{DecisionPolicy, DriveConfig, RunReport, drive_run, validate_reports};
use service::LocalScoringService;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    /// Human-readable colored summary
    Console,
    /// Machine-readable JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "wealthquest-tester", version)]
#[command(about = "Headless QA harness for the WealthQuest run state machine")]
struct Args {
    /// Number of runs to play
    #[arg(long, default_value_t = 10)]
    runs: u32,

    /// Base RNG seed; run i plays with seed + i
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Decision policy for the scripted player
    #[arg(long, value_enum, default_value_t = DecisionPolicy::Explore)]
    policy: DecisionPolicy,

    /// Rebuild the session from the durable cache before every step
    #[arg(long)]
    reload_each_step: bool,

    /// Drop the run server-side after N commits to exercise expiry handling
    #[arg(long)]
    drop_after: Option<usize>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("{}", "WealthQuest Logic Tester".bright_cyan().bold());
    println!("{}", "========================".cyan());

    let mut reports = Vec::with_capacity(args.runs as usize);
    for i in 0..args.runs {
        let seed = args.seed + u64::from(i);
        let service = LocalScoringService::with_embedded_catalog(seed)
            .context("loading the embedded scenario catalog")?;
        let config = DriveConfig {
            policy: args.policy,
            seed,
            reload_each_step: args.reload_each_step,
            drop_after: args.drop_after,
        };
        let report = drive_run(&service, &config)
            .await
            .with_context(|| format!("driving run with seed {seed}"))?;
        reports.push(report);
    }

    match args.report {
        ReportFormat::Console => print_console_report(&reports),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    if let Err(err) = validate_reports(&reports) {
        eprintln!("{} {err}", "FAIL".red().bold());
        std::process::exit(1);
    }
    Ok(())
}

fn print_console_report(reports: &[RunReport]) {
    for report in reports {
        let status = if report.passed() {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        let detail = if report.outcome == "expired" {
            format!("expired after {} decisions", report.decisions)
        } else {
            format!(
                "{}/{} pts ({:.0}%) {} after {} decisions, {} reloads",
                report.total_score,
                report.max_score,
                report.percentage,
                report.badge,
                report.decisions,
                report.reloads
            )
        };
        println!("{status} run {:>4} [{}] {detail}", report.run_id, report.policy);
        for violation in &report.violations {
            println!("     {} {violation}", "!".red());
        }
    }
    let passed = reports.iter().filter(|r| r.passed()).count();
    println!(
        "{}",
        format!("{passed}/{} runs passed", reports.len()).bright_cyan()
    );
}
