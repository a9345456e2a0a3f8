use std::collections::BTreeMap;

use serde::Serialize;

use samtv_core::{ActiveState, PowerState, Television};

use super::OutputOpts;
use crate::error::CliError;
use crate::output::{paint_power, print_output, render_single};

#[derive(Debug, Serialize)]
struct StatusView {
    name: String,
    id: String,
    host: String,
    model: Option<String>,
    mac: Option<String>,
    power: PowerState,
    active: ActiveState,
    /// `None` when the TV did not answer.
    token_auth: Option<bool>,
    capabilities: BTreeMap<String, bool>,
}

pub async fn handle(tv: &Television, out: OutputOpts) -> Result<(), CliError> {
    let descriptor = tv.descriptor();

    let (power, token_auth, capabilities) = match tv.status().await {
        Ok(status) => (
            PowerState::from(status.power),
            Some(status.token_auth_supported),
            status
                .capabilities
                .iter()
                .map(|(flag, enabled)| (flag.to_owned(), enabled))
                .collect(),
        ),
        Err(e) if e.is_unreachable() => {
            tracing::debug!(error = %e, "status probe failed");
            (PowerState::Unreachable, None, BTreeMap::new())
        }
        Err(e) => return Err(e.into()),
    };

    let view = StatusView {
        name: descriptor.name.clone(),
        id: descriptor.id.clone(),
        host: descriptor.host.clone(),
        model: descriptor.model.clone(),
        mac: descriptor.mac.as_ref().map(ToString::to_string),
        power,
        active: ActiveState::from(power),
        token_auth,
        capabilities,
    };

    let color = out.color;
    let rendered = render_single(
        out.format,
        &view,
        |v| detail_rows(v, color),
        |v| v.power.to_string(),
    )?;
    print_output(&rendered, out.quiet);
    Ok(())
}

fn detail_rows(v: &StatusView, color: bool) -> Vec<(String, String)> {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    let enabled: Vec<&str> = v
        .capabilities
        .iter()
        .filter(|(_, on)| **on)
        .map(|(flag, _)| flag.as_str())
        .collect();

    vec![
        ("Name".into(), v.name.clone()),
        ("ID".into(), v.id.clone()),
        ("Host".into(), v.host.clone()),
        ("Model".into(), or_dash(&v.model)),
        ("MAC".into(), or_dash(&v.mac)),
        ("Power".into(), paint_power(v.power, color)),
        (
            "Token auth".into(),
            v.token_auth.map_or_else(|| "-".into(), |b| if b { "yes" } else { "no" }.into()),
        ),
        (
            "Capabilities".into(),
            if enabled.is_empty() {
                "-".into()
            } else {
                enabled.join(", ")
            },
        ),
    ]
}
