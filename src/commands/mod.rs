pub mod apply;
pub mod config;
pub mod list;
pub mod node;
pub mod resolve;

use anyhow::{Context as _, Result, bail};
use declarative::{Config, Node, RecordingSink, Registry};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::{Context, catalog, host, ui};

/// Everything a command needs to resolve against this host
pub struct Session {
    pub config: Config,
    pub node: Node,
    pub registry: &'static Registry,
    warnings: Arc<RecordingSink>,
}

impl Session {
    /// Load config, prepare the global registry and gather node attributes
    pub fn open(ctx: &Context, node_file: Option<&Path>) -> Result<Self> {
        let config = crate::config::with_overrides(crate::config::load()?, ctx.why_run, ctx.strict);

        let registry = Registry::global();
        registry.apply_config(&config);
        let warnings = Arc::new(RecordingSink::new());
        registry.warnings().add_sink(warnings.clone());
        catalog::install(registry).context("Failed to register built-in resources")?;

        let node = match node_file {
            Some(path) => host::load(path)?,
            None => host::detect(),
        };
        log::debug!("Node: {}", node.summary());

        Ok(Self {
            config,
            node,
            registry,
            warnings,
        })
    }

    /// Note how many warnings the registry raised, if any
    pub fn report_warnings(&self, ctx: &Context) {
        let count = self.warnings.take().len();
        if count > 0 && !ctx.quiet {
            ui::dim(&format!("{count} deprecation warning(s) raised"));
        }
    }
}

/// Parse an `ATTR=VALUE` assignment
///
/// Values that look like JSON literals (`true`, `false`, `null`, arrays and
/// objects) are parsed as JSON; everything else is a string.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((attribute, value)) = raw.split_once('=') else {
        bail!("Expected ATTR=VALUE, got '{raw}'");
    };
    let attribute = attribute.trim();
    if attribute.is_empty() {
        bail!("Missing attribute name in '{raw}'");
    }

    let looks_like_json = matches!(value, "true" | "false" | "null")
        || value.starts_with('[')
        || value.starts_with('{');
    let value = if looks_like_json {
        serde_json::from_str(value).with_context(|| format!("Invalid JSON value for {attribute}"))?
    } else {
        Value::String(value.to_string())
    };
    Ok((attribute.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("version=1.2.3").unwrap(),
            ("version".to_string(), json!("1.2.3"))
        );
        assert_eq!(
            parse_assignment("enabled=true").unwrap(),
            ("enabled".to_string(), json!(true))
        );
        assert_eq!(
            parse_assignment("options=[\"--no-install-recommends\"]").unwrap(),
            ("options".to_string(), json!(["--no-install-recommends"]))
        );
        assert_eq!(
            parse_assignment("message=a=b").unwrap(),
            ("message".to_string(), json!("a=b"))
        );
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("version").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("options=[oops").is_err());
    }
}
