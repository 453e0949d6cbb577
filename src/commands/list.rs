use anyhow::Result;
use colored::Colorize;

use super::Session;
use super::resolve::print_candidates;
use crate::{Context, ui};

pub fn run(ctx: &Context, providers: bool) -> Result<()> {
    let session = Session::open(ctx, None)?;
    let registry = session.registry;

    let (title, names) = if providers {
        ("Provider names", registry.provider_names())
    } else {
        ("Resource names", registry.resource_names())
    };
    ui::header(title);

    for name in &names {
        let mut line = name.to_string().bold().to_string();
        if !providers && let Some(replacement) = registry.deprecation(name.as_str()) {
            match replacement {
                Some(r) => line.push_str(&format!(" (deprecated, use {r})")),
                None => line.push_str(" (deprecated)"),
            }
        }
        println!();
        println!("{line}");

        let candidates = if providers {
            registry.provider_candidates(name.as_str())
        } else {
            registry.resource_candidates(name.as_str())
        };
        print_candidates(&candidates);
    }

    if !ctx.quiet {
        println!();
        ui::dim(&format!("{} names", names.len()));
    }
    Ok(())
}
