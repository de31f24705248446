//! stup command line entry point

use chrono::Local;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stup::config::ConfigLoader;
use stup::deploy::{DeployPlan, DeployReport, UploadOutcome};
use stup::prompt::{choose_project, choose_target, Prompt, TerminalPrompt};
use stup::InitPolicy;

/// Deploy git repositories to FTP targets using git-ftp
#[derive(Debug, Parser)]
#[command(name = "stup", version, about)]
struct Cli {
    /// Project to deploy (asked for when omitted)
    #[arg(short, long)]
    project: Option<String>,

    /// Target to deploy to (asked for when omitted)
    #[arg(short, long)]
    target: Option<String>,

    /// Answer yes to all confirmations
    #[arg(short = 'y', long = "yes")]
    yes: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Initialize uninitialized remotes: never, ask or always
    #[arg(long, value_name = "POLICY")]
    init: Option<InitPolicy>,
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from(env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(report) => {
            print_report(&report);
            info!("✅ Deployment was successful");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("🔴 {}", e);
            if let stup::Error::RemoteNotInitialized { init_command, .. } = &e {
                error!("🔵 You could init git-ftp for this repo with:");
                error!("       {}", init_command);
            }
            error!("❌ Deployment Canceled!");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> stup::Result<DeployReport> {
    info!(
        "[{}] Starting stup deployment via SSH",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let mut loader = ConfigLoader::new();
    let mut config = loader.load(cli.config.as_deref())?;
    if let Some(path) = loader.current_path() {
        info!("Using configuration {}", path.display());
    }
    if let Some(policy) = cli.init {
        config.deploy.init_policy = policy;
    }

    for tool in stup::missing_tools() {
        warn!("⚠️  '{}' was not found in PATH", tool);
    }

    let prompt = TerminalPrompt;
    let prompt: &dyn Prompt = &prompt;
    let (project_id, project) = choose_project(&config, cli.project.as_deref(), prompt)?;
    let (target_id, target) =
        choose_target(&project_id, project, cli.target.as_deref(), prompt)?;

    let plan = DeployPlan::new(
        &project_id,
        project,
        &target_id,
        target,
        &config.deploy.custom_folder,
    );
    stup::deploy(&config, &plan, cli.yes, prompt).await
}

fn print_report(report: &DeployReport) {
    println!();
    println!(
        "Deployed {} to {}",
        report.project_id, report.target_id
    );
    if let Some(version) = &report.version {
        println!("  version: {}", version);
    }

    for upload in &report.uploads {
        let summary = match &upload.outcome {
            UploadOutcome::UpToDate => "already up-to-date".to_string(),
            UploadOutcome::Initialized { files } => match files {
                Some(n) => format!("initialized, {} files", n),
                None => "initialized".to_string(),
            },
            UploadOutcome::Uploaded { files, range, .. } => {
                let files = files.map_or("some".to_string(), |n| n.to_string());
                match range {
                    Some(range) => format!("{} files, {}..{}", files, range.pre, range.post),
                    None => format!("{} files", files),
                }
            }
        };
        println!("  {}: {}", upload.repo, summary);
    }

    for history in &report.histories {
        for commit in &history.commits {
            println!("  - [{}] {} ({})", history.repo, commit.message, commit.hash);
        }
    }

    for tag in &report.tags {
        println!("  tag {} -> {} in {}", tag.tag, tag.commit, tag.repo);
    }

    let hints = report.hints();
    if !hints.is_empty() {
        println!();
        println!("Hints:");
        for hint in hints {
            println!("  💡 [{}] {} ({})", hint.repo, hint.text, hint.commit);
        }
    }
}
