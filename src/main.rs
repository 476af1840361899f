use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;

mod aggregator;
mod calculator;
mod config;
mod console;
mod datetime;
mod directory;
mod error;
mod logger;
mod pay_period;
mod pto;
mod report;
mod serve_command;
mod status_command;
mod time_entry;
mod timecard;
mod toggl;

use config::Config;
use directory::ProjectDirectory;
use serve_command::{serve_command, AppState, ServeArgs};
use status_command::{StatusArgs, StatusCommand};
use toggl::TogglClient;

/// Togglのtime entryから今日と給与期間の作業時間を表示するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run
/// $ cargo run -- status --pto
/// $ cargo run -- status --now 2024-03-15
/// $ cargo run -- serve --port 8080
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        short = 'c',
        long = "config",
        parse(from_os_str),
        help = "Reads additional settings from this TOML file"
    )]
    config: Option<PathBuf>,

    #[clap(
        short = 'v',
        long = "verbose",
        parse(from_occurrences),
        help = "Increases log verbosity (-v, -vv, -vvv)"
    )]
    verbose: u64,

    #[clap(subcommand)]
    subcommand: Option<SubCommands>,
}

/// サブコマンドを表す列挙型。省略した場合は`status`とする。
#[derive(Debug, Subcommand)]
enum SubCommands {
    Status(StatusArgs),
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose)?;

    let config = Config::load_from(args.config.as_deref())?;
    debug!("Config: {:?}", config);
    let toggl_client = TogglClient::new(config.api_token()?).with_api_url(&config.api_url);
    let directory = ProjectDirectory::new();

    match args
        .subcommand
        .unwrap_or_else(|| SubCommands::Status(StatusArgs::default()))
    {
        SubCommands::Status(status) => {
            let mut stdout = io::stdout().lock();
            StatusCommand::new(&toggl_client, &directory, &config.settings)
                .run(status, &mut stdout)
                .await?;
        }
        SubCommands::Serve(serve) => {
            let state = AppState::new(
                Arc::new(toggl_client),
                Arc::new(directory),
                Arc::new(config.settings),
            );
            serve_command(serve, state).await?;
        }
    }

    Ok(())
}
