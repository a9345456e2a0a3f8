use tracing::debug;

use samtv_core::{RemoteIntent, Television};

use crate::cli::KeyArgs;
use crate::error::CliError;

pub async fn key(args: &KeyArgs, tv: &Television) -> Result<(), CliError> {
    let intent = RemoteIntent::Key(args.key.into());
    for _ in 0..args.repeat.max(1) {
        send(tv, intent.clone()).await?;
    }
    Ok(())
}

pub async fn send(tv: &Television, intent: RemoteIntent) -> Result<(), CliError> {
    debug!(?intent, "sending");
    tv.send(&intent).await?;
    Ok(())
}
