use serde::Serialize;
use tracing::info;

use samtv_core::{PowerState, Television};

use super::OutputOpts;
use crate::cli::{PowerArgs, PowerTarget};
use crate::error::CliError;
use crate::output::{paint_power, print_output, render_single};

#[derive(Debug, Serialize)]
struct PowerView {
    name: String,
    power: PowerState,
}

pub async fn handle(args: &PowerArgs, tv: &Television, out: OutputOpts) -> Result<(), CliError> {
    let target = match args.state {
        PowerTarget::On => PowerState::On,
        PowerTarget::Off => PowerState::Standby,
    };

    info!(%target, "changing power state");
    tv.set_power(target).await?;

    let view = PowerView {
        name: tv.descriptor().name.clone(),
        power: target,
    };
    let color = out.color;
    let rendered = render_single(
        out.format,
        &view,
        |v| {
            vec![
                ("Name".into(), v.name.clone()),
                ("Power".into(), paint_power(v.power, color)),
            ]
        },
        |v| v.power.to_string(),
    )?;
    print_output(&rendered, out.quiet);
    Ok(())
}
