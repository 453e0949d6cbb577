use anyhow::Result;
use declarative::{Action, Candidate, DslName, Error, ErrorCategory, Resource};

use super::Session;
use crate::cli::ResolveArgs;
use crate::{Context, ui};

pub fn run(ctx: &Context, args: ResolveArgs) -> Result<()> {
    let session = Session::open(ctx, args.node.node.as_deref())?;
    let registry = session.registry;

    if !ctx.quiet {
        ui::header(&format!("Resolving {}", args.dsl_name));
        ui::kv("node", &session.node.summary());
    }

    let Some(class) = registry.resolve_resource(&args.dsl_name, &session.node)? else {
        return Err(Error::NoSuchResourceType {
            dsl_name: args.dsl_name,
            node: session.node.summary(),
        }
        .into());
    };
    let actions: Vec<String> = class.actions().iter().map(ToString::to_string).collect();
    ui::kv("resource", class.name());
    ui::kv("actions", &actions.join(", "));

    let resource = Resource::new(class.clone(), args.name, DslName::new(&args.dsl_name)?);
    let action = match args.action {
        Some(action) => Action::new(action)?,
        None => class.default_action().clone(),
    };
    match registry.resolve_provider(&resource, &action, &session.node) {
        Ok(provider) => ui::kv(&format!("provider ({action})"), provider.name()),
        Err(e) if e.category() == ErrorCategory::Resolution => ui::warn(&e.to_string()),
        Err(e) => return Err(e.into()),
    }

    if ctx.verbose > 0 {
        ui::section("Resource candidates");
        print_candidates(&registry.resource_candidates(&args.dsl_name));
        ui::section("Provider candidates");
        print_candidates(&registry.provider_candidates(&args.dsl_name));
    }

    session.report_warnings(ctx);
    Ok(())
}

pub(crate) fn print_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        ui::dim("(none)");
    }
    for candidate in candidates {
        ui::dim(&describe(candidate));
    }
}

fn describe(candidate: &Candidate) -> String {
    let mut line = format!("{} {}", candidate.class_name, candidate.filter);
    if candidate.flags.overrides {
        line.push_str(" [override]");
    }
    if candidate.flags.prepend {
        line.push_str(" [prepend]");
    }
    if candidate.has_callback {
        line.push_str(" [provides?]");
    }
    line
}
