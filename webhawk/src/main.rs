//! Web Hawk server entry point

use clap::Parser;
use tracing::{error, info};
use webhawk::cli::{serve::ServeArgs, Cli, Commands};
use webhawk::common::error::HawkError;
use webhawk::config::{ConfigOverrides, HawkConfig};
use webhawk::logging::{self, ConsoleTarget};
use webhawk::shutdown::ShutdownController;

/// 設定エラー時の終了コード
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check(args)) => {
            init_logging(ConsoleTarget::Stderr);
            if let Err(e) = webhawk::cli::check::execute(&args).await {
                error!("{}", e);
                std::process::exit(exit_code(&e));
            }
        }
        Some(Commands::Serve(args)) => run_server(&args).await,
        None => run_server(&ServeArgs::default()).await,
    }
}

fn init_logging(console: ConsoleTarget) {
    if let Err(e) = logging::init(console) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn exit_code(error: &HawkError) -> i32 {
    match error {
        HawkError::Config(_) => EXIT_CONFIG_ERROR,
        _ => 1,
    }
}

async fn run_server(args: &ServeArgs) {
    init_logging(ConsoleTarget::Stdout);
    info!("Web Hawk v{}", env!("CARGO_PKG_VERSION"));

    let config = match HawkConfig::resolve(&ConfigOverrides::from(args)) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    info!(
        targets = config.targets.len(),
        poll_interval_secs = config.poll_interval_secs,
        cors = config.cors_origin.as_deref().unwrap_or(""),
        "Configuration loaded"
    );

    if let Err(e) = webhawk::server::run(config, ShutdownController::default()).await {
        error!("Fatal: {}", e);
        std::process::exit(exit_code(&e));
    }
}
