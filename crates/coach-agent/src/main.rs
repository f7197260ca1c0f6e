//! # coach
//!
//! Coding-coach bridge binary. Watches solution files, extracts the problem
//! tag and comment thoughts once editing settles, and streams them to the
//! coaching backend. Also exposes the backend's statement and summary views.

#![deny(unsafe_code)]

mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coach_bridge::{BridgeConfig, CoachBridge};
use coach_client::{CoachApiClient, StatementBrowser};
use coach_core::ProblemId;
use coach_settings::CoachSettings;

/// Coding-coach bridge.
#[derive(Parser, Debug)]
#[command(name = "coach", version, about = "Stream solution drafts to the coaching backend")]
struct Cli {
    /// Settings file (defaults to `~/.coach/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend host (overrides settings).
    #[arg(long, global = true)]
    host: Option<String>,

    /// Backend port (overrides settings).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Base URL of the statement/summary API (overrides settings).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Quiet period in milliseconds before a change is analysed.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    quiet_ms: Option<u64>,

    /// Log level filter, e.g. `debug` or `coach_bridge=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch files and stream settled edits until Ctrl-C.
    Watch {
        /// Files to watch.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the snapshot extracted from a file.
    Extract {
        /// File to analyse.
        file: PathBuf,
    },
    /// List problem statements.
    Statements,
    /// Show the summary for one problem.
    Summary {
        /// Problem identifier, e.g. `500A`.
        problem_id: String,
    },
}

impl Cli {
    fn apply_overrides(&self, settings: &mut CoachSettings) {
        if let Some(host) = &self.host {
            settings.bridge.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.bridge.port = port;
        }
        if let Some(url) = &self.api_url {
            settings.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = self.quiet_ms {
            settings.bridge.quiet_period_ms = ms;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }

    fn load_settings(&self) -> Result<CoachSettings> {
        let path = self.config.clone().unwrap_or_else(coach_settings::settings_path);
        let mut settings = coach_settings::load_settings_from_path(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        self.apply_overrides(&mut settings);
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = cli.load_settings()?;
    let _ = coach_settings::init_settings(settings);
    let settings = coach_settings::get_settings();
    coach_logging::init_from_settings(&settings.logging);

    match cli.command {
        Command::Watch { files } => {
            let config = BridgeConfig::from(&settings.bridge);
            tracing::info!(url = %config.ws_url, quiet_period = ?config.quiet_period, "starting bridge");
            let bridge = CoachBridge::connect_default(config);
            watch::run(&bridge, &files).await?;
        }
        Command::Extract { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            println!("{}", snapshot_json(&text)?);
        }
        Command::Statements => {
            let mut browser = StatementBrowser::new(CoachApiClient::from_settings(&settings.api));
            let _ = browser.load().await;
            print!("{}", browser.render());
        }
        Command::Summary { problem_id } => {
            let problem_id = ProblemId::parse(&problem_id)
                .with_context(|| format!("invalid problem id {problem_id:?}"))?;
            let client = CoachApiClient::from_settings(&settings.api);
            match client.fetch_summary(problem_id.as_str()).await {
                Ok(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                Err(err) => {
                    eprintln!("no summary for {problem_id}: {err}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn snapshot_json(text: &str) -> Result<String> {
    let snapshot = coach_core::extract(text);
    let value = serde_json::json!({
        "problemId": &snapshot.problem_id,
        "problemsetUrl": snapshot.problem_id.as_ref().map(ProblemId::problemset_url),
        "code": &snapshot.code,
        "thoughts": &snapshot.thoughts,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
