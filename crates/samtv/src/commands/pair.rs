use serde::Serialize;

use samtv_core::{AuthStatus, Television, TvConfig};

use super::OutputOpts;
use crate::error::CliError;
use crate::output::{print_output, render_single};

#[derive(Debug, Serialize)]
struct PairView {
    name: String,
    id: String,
    authenticated: bool,
    credential_dir: String,
}

/// Open the channel and wait for the TV to admit us. A first pairing
/// shows an access prompt on the TV; the token it returns is stored.
pub async fn handle(tv: &Television, config: &TvConfig, out: OutputOpts) -> Result<(), CliError> {
    if !out.quiet {
        eprintln!("Waiting for the TV to approve this client (check the TV screen)...");
    }
    let auth = tv.pair().await?;

    let descriptor = tv.descriptor();
    let view = PairView {
        name: descriptor.name.clone(),
        id: descriptor.id.clone(),
        authenticated: auth == AuthStatus::Authenticated,
        credential_dir: config.storage_dir.display().to_string(),
    };
    let rendered = render_single(
        out.format,
        &view,
        |v| {
            vec![
                ("Name".into(), v.name.clone()),
                ("ID".into(), v.id.clone()),
                (
                    "Token".into(),
                    if v.authenticated {
                        "stored".into()
                    } else {
                        "none issued".into()
                    },
                ),
                ("Credentials".into(), v.credential_dir.clone()),
            ]
        },
        |v| if v.authenticated { "authenticated" } else { "unauthenticated" }.into(),
    )?;
    print_output(&rendered, out.quiet);
    Ok(())
}
