use anyhow::Result;
use declarative::{Block, Dsl, ResourceState, RunContext};
use serde_json::json;

use super::{Session, parse_assignment};
use crate::cli::ApplyArgs;
use crate::{Context, ui};

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let session = Session::open(ctx, args.node.node.as_deref())?;
    let block = build_block(&args.set, &args.action)?;

    let dsl = Dsl::new(session.registry);
    let mut run_context =
        RunContext::new(session.node.clone()).with_config(session.config.clone());
    let resource = dsl.dispatch_block(&mut run_context, &args.dsl_name, &[json!(args.name)], &block)?;
    if !ctx.quiet {
        ui::header(&format!("Converging {resource}"));
        ui::kv("resource", resource.class().name());
    }

    let summary = dsl.converge(&mut run_context)?;

    for resource in run_context.resource_collection.iter() {
        let state = resource.state();
        match state {
            ResourceState::Updated => ui::success(&format!("{resource} {state}")),
            _ => ui::info(&format!("{resource} {state}")),
        }
    }
    if session.config.why_run && summary.skipped > 0 && !ctx.quiet {
        ui::dim("Why-run mode: no changes were made");
    }

    session.report_warnings(ctx);
    Ok(())
}

/// Turn `--set` and `--action` flags into a recipe block
fn build_block(assignments: &[String], actions: &[String]) -> Result<Block> {
    let mut block = Block::new();
    for raw in assignments {
        let (attribute, value) = parse_assignment(raw)?;
        block = block.set(attribute, value);
    }
    for action in actions {
        block = block.action(action.as_str());
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_block() {
        let block = build_block(
            &["version=2.43.0".to_string(), "package_name=git-core".to_string()],
            &["remove".to_string()],
        )
        .unwrap();
        assert_eq!(block.attributes["version"], json!("2.43.0"));
        assert_eq!(block.attributes["package_name"], json!("git-core"));
        assert_eq!(block.action, ["remove"]);
    }

    #[test]
    fn test_build_block_rejects_bad_assignment() {
        assert!(build_block(&["version".to_string()], &[]).is_err());
    }
}
