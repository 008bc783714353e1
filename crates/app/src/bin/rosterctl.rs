// CTFBoard roster operator CLI

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use ctfboard_app::cli::{self, Cli, Command};
use ctfboard_common::config::Config;
use ctfboard_common::Error as AppError;
use ctfboard_teams::RosterConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_caller_error() {
                info!(code = err.error_code(), "Request rejected");
            } else {
                error!(code = err.error_code(), error = %err, "Command failed");
            }
            eprintln!("{}", cli::render_failure(&err));
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(command: Command) -> Result<(), AppError> {
    let config = Config::from_env()?;
    ctfboard_app::init_tracing(&config);

    let roster = RosterConfig::from_env()?;
    let pool = ctfboard_app::connect(&config).await?;

    if let Command::Migrate = command {
        ctfboard_app::run_migrations(&pool).await?;
        info!("Migrations applied");
        return Ok(());
    }

    let engine = ctfboard_app::build_engine(pool, roster);
    cli::execute(&engine, command).await
}
