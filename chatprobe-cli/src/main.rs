//! chatprobe CLI
//!
//! Runs a scripted prompt list against the configured chatbot apps through an
//! Appium server and writes the captured transcripts to disk.
//!
//! Usage from workspace root:
//!   cargo run --bin chatprobe -- run --prompts prompts.csv
//!   cargo run --bin chatprobe -- run --prompts prompts.json --apps wysa --capture await-change
//!   cargo run --bin chatprobe -- apps
//!   cargo run --bin chatprobe -- check-prompts prompts.csv

use anyhow::{Context, Result};
use chatprobe::{load_prompts, CapturePolicy, Harness, HarnessConfig, Role, RunReport};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatprobe")]
#[command(about = "Scripted conversation harness for mobile chatbot apps")]
#[command(
    long_about = "chatprobe drives chatbot apps through an Appium server, sends each prompt from a CSV or JSON file, captures the bot's replies and saves the transcripts as JSON and plain text."
)]
struct Cli {
    /// Enable debug logging
    #[clap(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
#[clap(rename_all = "kebab-case")]
enum CaptureArg {
    FixedDelay,
    AwaitChange,
}

impl From<CaptureArg> for CapturePolicy {
    fn from(arg: CaptureArg) -> Self {
        match arg {
            CaptureArg::FixedDelay => CapturePolicy::FixedDelay,
            CaptureArg::AwaitChange => CapturePolicy::AwaitChange,
        }
    }
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Prompt file (.csv, .tsv or .json)
    #[clap(long, short = 'p', env = "CHATPROBE_PROMPTS")]
    prompts: PathBuf,

    /// YAML or JSON configuration file
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Appium server URL (e.g., http://127.0.0.1:4723)
    #[clap(long, short = 's', env = "CHATPROBE_SERVER")]
    server: Option<String>,

    /// Device name passed to the automation server
    #[clap(long)]
    device: Option<String>,

    /// Directory for transcript files
    #[clap(long, short = 'o', env = "CHATPROBE_OUTPUT")]
    output_dir: Option<PathBuf>,

    /// Apps to test, by profile name (default: all configured apps)
    #[clap(long, value_delimiter = ',')]
    apps: Vec<String>,

    /// How to recognise the bot's reply
    #[clap(long, value_enum)]
    capture: Option<CaptureArg>,

    /// Abort when the prompt file is missing or malformed instead of running with no prompts
    #[clap(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the prompt list against every configured app
    Run(RunArgs),
    /// List the configured app profiles
    Apps {
        /// YAML or JSON configuration file
        #[clap(long, short = 'c')]
        config: Option<PathBuf>,
    },
    /// Parse a prompt file and report what would be sent
    CheckPrompts {
        /// Prompt file (.csv, .tsv or .json)
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatprobe={default_level},{default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Apps { config } => list_apps(config.as_ref()),
        Commands::CheckPrompts { path } => check_prompts(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(server) = args.server {
        config.driver.server_url = server;
    }
    if let Some(device) = args.device {
        config.driver.device_name = device;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(capture) = args.capture {
        config.capture = capture.into();
    }
    config.select_apps(&args.apps)?;

    info!("Loading prompts from {}", args.prompts.display());
    let prompts = load_prompts(&args.prompts, args.strict).context("Failed to load prompts")?;
    info!("Loaded {} prompts", prompts.len());

    info!("Connecting to {}", config.driver.server_url);
    let harness = Harness::connect(config)
        .await
        .context("Failed to start automation session")?;

    let cancel = harness.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current step and stopping");
            cancel.cancel();
        }
    });

    let report = harness.run(&prompts).await;
    let saved = report.session.write_to(&harness.config().output_dir);

    // The driver session is released whatever happened above
    if let Err(e) = harness.shutdown().await {
        error!("Failed to close driver session: {}", e);
    }

    let files = saved.context("Failed to save transcripts")?;
    print_summary(&report);
    println!("  {} {}", "JSON:".dimmed(), files.json.display());
    println!("  {} {}", "Text:".dimmed(), files.text.display());

    if harness.cancellation_token().is_cancelled() {
        anyhow::bail!("run was interrupted; partial transcripts were saved");
    }
    if !report.is_success() {
        anyhow::bail!(
            "{} of {} app sessions ended early; partial transcripts were saved",
            report.failures.len(),
            report.session.conversations.len()
        );
    }
    println!("{}", "✅ Testing completed successfully!".green().bold());
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "Summary".bold());
    for conversation in &report.session.conversations {
        let sent = conversation.count(Role::User);
        let answered = conversation.count(Role::Bot);
        let ratio = format!("{answered}/{sent} answered");
        let ratio = if sent > 0 && answered == sent {
            ratio.green()
        } else if answered == 0 {
            ratio.red()
        } else {
            ratio.yellow()
        };
        println!(
            "  {:<8} {}  ({})",
            conversation.app_name.bold(),
            ratio,
            conversation.session_id.dimmed()
        );
    }
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "❌".red(),
            failure.app_name.bold(),
            failure.error
        );
    }
}

fn list_apps(config: Option<&PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    for app in &config.apps {
        println!(
            "{:<8} {:<28} warmup {:>5}ms  onboarding {:?}",
            app.name.bold(),
            app.package,
            app.warmup.as_millis(),
            app.onboarding
        );
    }
    Ok(())
}

fn check_prompts(path: &Path) -> Result<()> {
    let prompts = chatprobe::read_prompts(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    for (index, prompt) in prompts.iter().enumerate() {
        println!("{:>3}. {}", index + 1, prompt.text);
    }
    println!("{} {} prompts", "✅".green(), prompts.len());
    Ok(())
}
