use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use sociometric::models::AnalysisResult;
use sociometric::{analyze, QuestionBank, Thresholds};

mod db;
mod report;

#[derive(Parser)]
#[command(name = "sociometric-analysis")]
#[command(about = "Peer-nomination sociogram and risk analysis for Group Scholar classes", long_about = None)]
struct Cli {
    /// TOML file overriding the default classification thresholds
    #[arg(long, global = true)]
    thresholds: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo class with survey answers
    Seed,
    /// Import survey responses from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the analysis for one or more groups and print a summary
    Analyze {
        #[arg(long = "group", required = true)]
        groups: Vec<String>,
        /// Write the full results as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List alerts for a group, most severe first
    Alerts {
        #[arg(long)]
        group: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        group: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn load_thresholds(path: Option<&PathBuf>) -> anyhow::Result<Thresholds> {
    match path {
        Some(path) => Ok(Thresholds::from_toml_file(path)?),
        None => Ok(Thresholds::default()),
    }
}

/// Fetch everything for the given groups up front, then run one pipeline per
/// group on the blocking pool.
async fn run_analyses(
    pool: &PgPool,
    groups: &[String],
    thresholds: Thresholds,
) -> anyhow::Result<Vec<AnalysisResult>> {
    let catalog = Arc::new(QuestionBank::new(db::fetch_questions(pool).await?));
    let thresholds = Arc::new(thresholds);
    let responses = db::fetch_responses(pool, groups).await?;
    let analyzed_at = Utc::now();

    let mut tasks = Vec::new();
    for group in groups {
        let students = db::fetch_students(pool, group).await?;
        let responses: Vec<_> = responses
            .iter()
            .filter(|r| students.iter().any(|s| s.id == r.student_id))
            .cloned()
            .collect();
        let catalog = Arc::clone(&catalog);
        let thresholds = Arc::clone(&thresholds);
        let group = group.clone();

        tasks.push(tokio::task::spawn_blocking(move || {
            analyze(
                &group,
                &students,
                &responses,
                catalog.as_ref(),
                &thresholds,
                analyzed_at,
            )
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.context("analysis task panicked")?);
    }
    Ok(results)
}

async fn run_one(
    pool: &PgPool,
    group: &str,
    thresholds: Thresholds,
) -> anyhow::Result<AnalysisResult> {
    run_analyses(pool, &[group.to_string()], thresholds)
        .await?
        .pop()
        .with_context(|| format!("no analysis produced for group {group}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let thresholds = load_thresholds(cli.thresholds.as_ref())?;
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} responses from {}.", csv.display());
        }
        Commands::Analyze { groups, out } => {
            let results = run_analyses(&pool, &groups, thresholds).await?;

            for result in &results {
                let summary = &result.executive_summary;
                println!(
                    "Group {}: {} students, {} relations, {} clusters, {} alerts ({} critical), {} at risk",
                    result.group_id,
                    summary.total_students,
                    summary.total_relations,
                    summary.cluster_count,
                    result.alerts.len(),
                    summary.critical_alerts,
                    summary.at_risk_students
                );
            }

            if let Some(out) = out {
                let json = serde_json::to_string_pretty(&results)?;
                std::fs::write(&out, json)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Results written to {}.", out.display());
            }
        }
        Commands::Alerts { group, limit } => {
            let result = run_one(&pool, &group, thresholds).await?;

            if result.alerts.is_empty() {
                println!("No alerts for group {group}.");
                return Ok(());
            }

            let names: std::collections::HashMap<_, _> = result
                .students
                .iter()
                .map(|s| (s.id, s.name.as_str()))
                .collect();
            println!("Alerts for group {group}:");
            for alert in report::sorted_alerts(&result.alerts).into_iter().take(limit) {
                let subject = alert
                    .student_id
                    .and_then(|id| names.get(&id).copied())
                    .or(alert.cluster_id.as_deref())
                    .unwrap_or("group");
                println!(
                    "- [{}] {} ({}) follow up by {}",
                    alert.severity.as_str(),
                    subject,
                    alert.alert_type.as_str(),
                    alert
                        .follow_up_at
                        .map(|at| at.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Commands::Report { group, out } => {
            let result = run_one(&pool, &group, thresholds).await?;
            let report = report::build_report(&result);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
