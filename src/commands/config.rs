use anyhow::Result;

use crate::config::{load, to_toml, with_overrides};
use crate::{Context, paths, ui};

pub fn run(ctx: &Context) -> Result<()> {
    let path = paths::config_file()?;
    let config = with_overrides(load()?, ctx.why_run, ctx.strict);

    ui::header("Configuration");
    ui::kv("file", &path.display().to_string());
    if !path.exists() {
        ui::dim("Not found, using defaults");
    }
    println!();
    print!("{}", to_toml(&config)?);
    Ok(())
}
