use anyhow::{Context as _, Result};

use crate::cli::NodeArgs;
use crate::{Context, host, ui};

pub fn run(ctx: &Context, args: NodeArgs) -> Result<()> {
    let node = match args.node.as_deref() {
        Some(path) => host::load(path)?,
        None => host::detect(),
    };

    if !ctx.quiet {
        ui::header("Node attributes");
    }
    let rendered =
        serde_json::to_string_pretty(&node.as_value()).context("Failed to render node")?;
    println!("{rendered}");
    Ok(())
}
