//! AWS MFA session issuer
//!
//! Issues short-lived, MFA-authenticated AWS session credentials and saves
//! them under a named profile so other tools can use them without asking for
//! an OTP again.
//!
//! The program performs the following operations:
//! 1. Parses and validates command-line arguments
//! 2. Checks that the `aws` CLI is installed
//! 3. Resolves the long-term identity from a profile or the environment
//! 4. Discovers the MFA device when none was given
//! 5. Exchanges the OTP code for a session token with STS
//! 6. Writes the session into the destination profile with `aws configure set`

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

mod cli;
mod client;
mod config;
mod context;
mod credentials;
mod error;
mod input;
mod logging;
mod profile;
#[cfg(test)]
mod testing;
mod updater;

use cli::Args;
use context::Context;
use profile::AwsCli;
use updater::DefaultUpdater;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(args.log_level.into(), args.log_format);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");

            for (depth, cause) in err.chain().enumerate() {
                info!("{} err-depth={depth}", cause.to_string().replace('\n', " "));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let cli = AwsCli::locate()?;

    let ctx = match args.timeout() {
        Some(timeout) => Context::new().with_timeout(timeout),
        None => Context::new(),
    };

    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            token.cancel();
        }
    });

    let input = args.into_input();
    DefaultUpdater::with_cli(cli)
        .issue_and_save(&ctx, &input)
        .await?;
    Ok(())
}
