mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use samtv_core::Television;

use crate::cli::{Cli, Command};
use crate::commands::OutputOpts;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a TV
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "samtv", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load()?;
            let tv_config = config::resolve_tv_config(&cli.global, &cfg)?;
            let out = OutputOpts {
                format: config::output_format(&cli.global, &cfg),
                color: output::should_color(cli.global.color),
                quiet: cli.global.quiet,
            };

            let tv = Television::connect(tv_config.clone()).await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &tv, &tv_config, out).await;
            tv.shutdown().await;
            result
        }
    }
}
