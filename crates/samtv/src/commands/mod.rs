//! Command handlers, one module per top-level command.

pub mod config_cmd;
pub mod pair;
pub mod power;
pub mod remote;
pub mod status;

use samtv_core::{RemoteIntent, Television, TvConfig};

use crate::cli::{Command, OutputFormat};
use crate::error::CliError;

/// Output settings resolved once per invocation.
#[derive(Debug, Clone, Copy)]
pub struct OutputOpts {
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

/// Run a command that talks to the TV.
pub async fn dispatch(
    cmd: Command,
    tv: &Television,
    config: &TvConfig,
    out: OutputOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(tv, out).await,
        Command::Power(args) => power::handle(&args, tv, out).await,
        Command::Key(args) => remote::key(&args, tv).await,
        Command::Text(args) => remote::send(tv, RemoteIntent::Text(args.text)).await,
        Command::Browse(args) => remote::send(tv, RemoteIntent::OpenBrowser(args.url)).await,
        Command::Launch(args) => {
            let intent = RemoteIntent::LaunchApp {
                app_id: args.app_id,
                meta_tag: args.meta_tag,
            };
            remote::send(tv, intent).await
        }
        Command::Cursor(args) => {
            remote::send(tv, RemoteIntent::CursorMove { x: args.x, y: args.y }).await
        }
        Command::Pair => pair::handle(tv, config, out).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a TV connection".into(),
        )),
    }
}
