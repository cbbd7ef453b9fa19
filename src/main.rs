use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use iat_prep::checks::{CheckStatus, CheckSeverity};
use iat_prep::config::Config;
use iat_prep::logging;
use iat_prep::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "iat_prep")]
#[command(about = "Cleaning and merge pipeline for IAT trial and demographic data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the merged analysis table
    Run {
        /// Trial-level IAT records (CSV)
        #[arg(long)]
        trials: PathBuf,
        /// Demographic survey records (CSV)
        #[arg(long)]
        demographics: PathBuf,
        /// Merged output table (CSV)
        #[arg(long)]
        output: PathBuf,
        /// Optional TOML config overriding key codes and thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional path for a machine-readable JSON run report
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run only the participation filter and error-rate audit
    Audit {
        /// Trial-level IAT records (CSV)
        #[arg(long)]
        trials: PathBuf,
        /// Optional TOML config overriding key codes and thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(p) => Ok(Config::load(&p)?),
        None => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trials,
            demographics,
            output,
            config,
            report,
        } => {
            let pipeline = Pipeline::new(load_config(config)?);
            match pipeline.run(&trials, &demographics, &output) {
                Ok(result) => {
                    println!("\n📊 Pipeline results:");
                    println!("   Raw trial rows: {}", result.raw_trial_rows);
                    println!(
                        "   Subjects: {} seen, {} retained, {} excluded",
                        result.subjects_seen, result.retained_subjects, result.excluded_subjects
                    );
                    println!("   Retained trial rows: {}", result.retained_rows);
                    println!(
                        "   Demographics: {} rows, {} subjects after cleaning",
                        result.demographic_rows, result.demographic_subjects
                    );
                    println!("   Output rows: {}", result.output_rows);
                    println!("   Output file: {}", output.display());

                    if !result.complete_later_attempts.is_empty() {
                        println!(
                            "\n⚠️  {} subject(s) excluded despite a complete later attempt (first-attempt-only rule):",
                            result.complete_later_attempts.len()
                        );
                        for subject in &result.complete_later_attempts {
                            println!("   - {}", subject);
                        }
                    }

                    let flagged: Vec<_> =
                        result.audits.iter().filter(|a| a.flagged).collect();
                    if !flagged.is_empty() {
                        println!(
                            "\n⚠️  {} high-error-rate subject(s) (flagged, not excluded):",
                            flagged.len()
                        );
                        for audit in flagged {
                            println!(
                                "   - {} ({:.1}% errors)",
                                audit.subject,
                                audit.error_rate * 100.0
                            );
                        }
                    }

                    println!("\n   Checks:");
                    for check in &result.checks.checks {
                        let marker = match (check.status, check.severity) {
                            (CheckStatus::Pass, _) => "✅",
                            (CheckStatus::Fail, CheckSeverity::Advisory) => "⚠️ ",
                            (CheckStatus::Fail, CheckSeverity::Fatal) => "❌",
                        };
                        println!(
                            "   {} {} ({} violations)",
                            marker, check.name, check.violations
                        );
                    }

                    if let Some(report_path) = report {
                        fs::write(&report_path, serde_json::to_string_pretty(&result)?)?;
                        println!("\n   Report written to {}", report_path.display());
                    }
                }
                Err(e) => {
                    error!("pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Audit { trials, config } => {
            let pipeline = Pipeline::new(load_config(config)?);
            match pipeline.run_audit(&trials) {
                Ok((audits, _checks)) => {
                    println!("\n📊 Per-subject error rates (upstream flag):");
                    for audit in &audits {
                        let marker = if audit.flagged { "⚠️ " } else { "  " };
                        println!(
                            "   {}{}: {}/{} errors ({:.1}%)",
                            marker,
                            audit.subject,
                            audit.errors,
                            audit.trials,
                            audit.error_rate * 100.0
                        );
                    }
                }
                Err(e) => {
                    error!("audit failed: {}", e);
                    println!("❌ Audit failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
