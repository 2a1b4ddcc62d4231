mod browse;
mod cli;
mod context;
mod upload;

use clap::Parser;
use eyre::Result;

use crate::cli::{Cli, Commands};
use crate::context::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = AppContext::load(&cli)?;

    match &cli.command {
        Commands::Dates(args) => browse::run_dates(&ctx, args).await?,
        Commands::Cameras(args) => browse::run_cameras(&ctx, args).await?,
        Commands::Defects(args) => browse::run_defects(&ctx, args).await?,
        Commands::Plan(args) => upload::run_plan(&ctx, args).await?,
        Commands::Upload(args) => upload::run_upload(&ctx, args).await?,
        Commands::UploadRoll(args) => upload::run_upload_roll(&ctx, args).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}
