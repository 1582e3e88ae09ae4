//! rulegate - GitOps validation for Palo Alto Networks security rules
//!
//! # Usage
//!
//! ```bash
//! rulegate validate                             # Validate firewall-rules/*.json
//! rulegate validate rules/web.json --check security
//! rulegate validate --dir rules --all --format json
//! rulegate dry-run rules/web.json --vsys vsys2  # Show the PAN-OS API calls
//! rulegate report --environment staging         # Markdown deployment report
//! rulegate policy                               # Print the effective policy
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use rulegate::config::{self, PolicyConfig};
use rulegate::core::deploy_report::{self, DeploymentReport};
use rulegate::core::rule::FirewallRule;
use rulegate::core::ruleset::{self, Check, FileOutcome, RuleSetOutcome, RuleSetValidator};
use rulegate::core::schema::SchemaValidator;
use rulegate::panos::DeploymentPlan;
use rulegate::panos::encode::DEFAULT_VSYS;
use rulegate::{Error, Result, audit, validators};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

const DEFAULT_RULES_DIR: &str = "firewall-rules";

#[derive(Parser)]
#[command(name = "rulegate")]
#[command(about = "GitOps validation for Palo Alto Networks security rules", long_about = None)]
struct Cli {
    /// Policy configuration file
    #[arg(long, global = true, env = "RULEGATE_POLICY", value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Rule JSON Schema to use instead of the bundled one
    #[arg(long, global = true, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckArg {
    All,
    Schema,
    Network,
    Security,
}

impl CheckArg {
    fn checks(self) -> Vec<Check> {
        match self {
            CheckArg::All => Check::all(),
            CheckArg::Schema => vec![Check::Schema, Check::Naming],
            CheckArg::Network => vec![Check::Network],
            CheckArg::Security => vec![Check::Security],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate rule files
    Validate {
        /// Rule files to validate (default: every rule file in --dir)
        files: Vec<PathBuf>,
        /// Directory to scan when no files are given
        #[arg(long, default_value = DEFAULT_RULES_DIR)]
        dir: PathBuf,
        /// Include templates, examples and backups
        #[arg(long)]
        all: bool,
        /// Which checks to run
        #[arg(long, value_enum, default_value_t = CheckArg::All)]
        check: CheckArg,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the PAN-OS API calls that would deploy a rule
    DryRun {
        /// Rule file
        file: PathBuf,
        /// Target virtual system
        #[arg(long, default_value = DEFAULT_VSYS)]
        vsys: String,
        /// Firewall hostname
        #[arg(long, env = "PANOS_HOSTNAME", default_value = "firewall")]
        host: String,
    },
    /// Generate a markdown deployment report
    Report {
        /// Directory holding the rule files
        #[arg(long, default_value = DEFAULT_RULES_DIR)]
        dir: PathBuf,
        /// Target environment named in the report
        #[arg(long, default_value = "production")]
        environment: String,
    },
    /// Print the effective policy configuration as JSON
    Policy,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(handle_cli(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. `Ok(false)` means the command ran but found problems.
async fn handle_cli(cli: Cli) -> Result<bool> {
    let run_id = Uuid::new_v4();
    let policy = config::load_policy(cli.policy.as_deref()).await?;

    match cli.command {
        Commands::Validate {
            files,
            dir,
            all,
            check,
            format,
        } => {
            let schema = load_schema(cli.schema.as_deref()).await?;
            let paths = if files.is_empty() {
                ruleset::discover_rule_files(&dir, all).await?
            } else {
                files
            };

            if paths.is_empty() {
                println!("No rule files found in {}", dir.display());
                return Ok(true);
            }

            let outcome = RuleSetValidator::new(&schema, &policy)
                .with_checks(check.checks())
                .validate_files(&paths)
                .await;

            match format {
                OutputFormat::Text => print_text(&outcome),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }

            let digests: serde_json::Map<String, serde_json::Value> = outcome
                .files
                .iter()
                .map(|f| (f.file.clone(), f.sha256.clone().into()))
                .collect();
            audit::log_validate(
                run_id,
                outcome.files.len(),
                outcome.error_count(),
                outcome.warning_count(),
                digests.into(),
            )
            .await;

            Ok(outcome.passed())
        }
        Commands::DryRun { file, vsys, host } => {
            let result = dry_run(&file, &vsys, &host).await;
            let (name, steps, error) = match &result {
                Ok((name, steps)) => (name.as_str(), *steps, None),
                Err(e) => ("", 0, Some(e.to_string())),
            };
            audit::log_dry_run(run_id, name, steps, error).await;
            result.map(|_| true)
        }
        Commands::Report { dir, environment } => {
            let paths = ruleset::discover_rule_files(&dir, false).await?;
            let entries = deploy_report::load_entries(&paths).await;
            let report = DeploymentReport::new(&environment, entries);
            print!("{}", report.render());

            let broken = report
                .entries
                .iter()
                .filter(|e| matches!(e, deploy_report::ReportEntry::Broken { .. }))
                .count();
            audit::log_report(run_id, &environment, report.entries.len() - broken, broken).await;
            Ok(true)
        }
        Commands::Policy => {
            print_policy(&policy)?;
            Ok(true)
        }
    }
}

async fn load_schema(path: Option<&Path>) -> Result<SchemaValidator> {
    match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            tracing::info!("Loaded schema from {}", path.display());
            SchemaValidator::from_str(&text)
        }
        None => SchemaValidator::bundled(),
    }
}

async fn dry_run(file: &Path, vsys: &str, host: &str) -> Result<(String, usize)> {
    let content = tokio::fs::read(file).await?;
    let value: serde_json::Value = serde_json::from_slice(&content)?;
    let rule = FirewallRule::from_value(&value)?;
    validators::validate_rule_name(&rule.rule_name)
        .map_err(|message| Error::validation("rule_name", message))?;

    let plan = DeploymentPlan::new(&rule, vsys, "GitOps deployment").with_key("api-key");

    println!("Dry run for rule '{}' on {host}", plan.rule_name);
    println!("XPath: {}", plan.xpath);
    println!();
    for (index, step) in plan.steps.iter().enumerate() {
        println!("{}. {}", index + 1, step.title);
        println!("   https://{host}/api/?{}", step.request.redacted());
    }

    Ok((plan.rule_name.clone(), plan.steps.len()))
}

fn print_policy(policy: &PolicyConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(policy)?);
    Ok(())
}

fn print_file(outcome: &FileOutcome) {
    let status = if outcome.passed() { "PASS" } else { "FAIL" };
    match &outcome.rule_name {
        Some(name) => println!("{status} {} ({name})", outcome.file),
        None => println!("{status} {}", outcome.file),
    }

    for error in &outcome.document.errors {
        println!("  error: {error}");
    }
    for check in &outcome.checks {
        for error in &check.report.errors {
            println!("  [{}] error: {error}", check.check);
        }
        for warning in &check.report.warnings {
            println!("  [{}] warning: {warning}", check.check);
        }
        for info in &check.report.info {
            println!("  [{}] info: {info}", check.check);
        }
    }
}

fn print_text(outcome: &RuleSetOutcome) {
    for file in &outcome.files {
        print_file(file);
    }
    for error in &outcome.set.errors {
        println!("error: {error}");
    }

    println!();
    println!(
        "{} files, {} failed, {} errors, {} warnings",
        outcome.files.len(),
        outcome.failed_files(),
        outcome.error_count(),
        outcome.warning_count()
    );
}
