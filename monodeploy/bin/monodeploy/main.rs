mod handlers;

use clap::{CommandFactory, Parser};
use monodeploy::{
    cli::{MonodeployArgs, MonodeploySubcommand},
    MonodeployResult,
};
use tracing_subscriber::{fmt, EnvFilter};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const DEFAULT_LOG_FILTER: &str = "monodeploy=info";
const VERBOSE_LOG_FILTER: &str = "monodeploy=debug";

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> MonodeployResult<()> {
    let args = MonodeployArgs::parse();

    // RUST_LOG wins over the verbose flag
    let default_filter = if args.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    match args.subcommand {
        Some(MonodeploySubcommand::Plan { path, config }) => {
            handlers::plan_subcommand(path, config).await?;
        }
        Some(MonodeploySubcommand::Deploy {
            path,
            config,
            skip_verify,
            comment,
        }) => {
            handlers::deploy_subcommand(path, config, skip_verify, comment).await?;
        }
        Some(MonodeploySubcommand::Validate { path, config }) => {
            handlers::validate_subcommand(path, config).await?;
        }
        None => {
            MonodeployArgs::command().print_help()?;
        }
    }

    Ok(())
}
