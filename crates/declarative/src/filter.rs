//! Host-attribute filters gating a registration.
//!
//! A [`Filter`] is a conjunction of attribute constraints. The empty filter
//! matches every node. Matchers are validated when the filter is built, so a
//! malformed filter fails at registration time and never at dispatch time.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::version::VersionRequirement;

/// Prefixes that make a string matcher a version range
const VERSION_OPERATORS: [&str; 7] = [">=", "<=", "!=", "~>", ">", "<", "="];

/// A single attribute constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Attribute equals this scalar
    Equals(Value),
    /// Attribute is one of these scalars
    OneOf(Vec<Value>),
    /// Attribute is a version satisfying this requirement
    Version(VersionRequirement),
}

impl Matcher {
    /// Build a matcher from a raw value
    ///
    /// Arrays become membership tests, strings starting with a comparison
    /// operator become version ranges, other scalars become equality tests.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                if let Some(bad) = items.iter().find(|v| !is_scalar(v)) {
                    return Err(Error::registration(format!(
                        "filter membership lists may only contain scalars, found {bad}"
                    )));
                }
                Ok(Self::OneOf(items))
            }
            Value::String(s) if VERSION_OPERATORS.iter().any(|op| s.trim_start().starts_with(op)) => {
                Ok(Self::Version(VersionRequirement::parse(&s)?))
            }
            Value::Object(_) => Err(Error::registration(
                "filter matchers cannot be maps".to_string(),
            )),
            scalar => Ok(Self::Equals(scalar)),
        }
    }

    /// Build the matcher for `attribute`
    ///
    /// On version attributes (`version`, `*_version`) a plain string or number
    /// is an exact version, so `10.4` matches a node at `10.4.0`.
    pub fn for_attribute(attribute: &str, value: Value) -> Result<Self> {
        if is_version_attribute(attribute)
            && let Some(exact) = version_text(&value)
        {
            return Ok(Self::Version(VersionRequirement::parse(&exact)?));
        }
        Self::from_value(value)
    }

    /// Check a node attribute value against this matcher
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Matcher::Equals(expected) => actual == expected,
            Matcher::OneOf(options) => options.contains(actual),
            Matcher::Version(req) => match actual {
                Value::String(s) => req.matches_str(s),
                Value::Number(n) => req.matches_str(&n.to_string()),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(v) => write!(f, "{v}"),
            Matcher::OneOf(options) => {
                let parts: Vec<String> = options.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Matcher::Version(req) => write!(f, "\"{req}\""),
        }
    }
}

fn is_version_attribute(attribute: &str) -> bool {
    let leaf = attribute.rsplit('.').next().unwrap_or(attribute);
    leaf == "version" || leaf.ends_with("_version")
}

fn version_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
    )
}

/// Conjunction of attribute constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    constraints: BTreeMap<String, Matcher>,
}

impl Filter {
    /// The empty filter, matching every node
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attribute == value`
    ///
    /// Version attributes compare as exact versions when `value` parses as
    /// one, and as plain values otherwise.
    pub fn with(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let exact = is_version_attribute(attribute)
            .then(|| version_text(&value))
            .flatten()
            .and_then(|text| VersionRequirement::parse(&text).ok());
        let matcher = match exact {
            Some(req) => Matcher::Version(req),
            None => Matcher::Equals(value),
        };
        self.constraints.insert(attribute.to_string(), matcher);
        self
    }

    /// Require the attribute to be one of `values`
    pub fn one_of<V: Into<Value>>(
        mut self,
        attribute: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.constraints
            .insert(attribute.to_string(), Matcher::OneOf(values));
        self
    }

    /// Require the attribute to be a version satisfying `requirement`
    pub fn version(mut self, attribute: &str, requirement: &str) -> Result<Self> {
        let req = VersionRequirement::parse(requirement)?;
        self.constraints
            .insert(attribute.to_string(), Matcher::Version(req));
        Ok(self)
    }

    /// Shorthand for `with("os", ..)`
    pub fn os(self, os: &str) -> Self {
        self.with("os", os)
    }

    /// Shorthand for `with("platform", ..)`
    pub fn platform(self, platform: &str) -> Self {
        self.with("platform", platform)
    }

    /// Shorthand for `with("platform_family", ..)`
    pub fn platform_family(self, family: &str) -> Self {
        self.with("platform_family", family)
    }

    /// Build a filter from a JSON object of `attribute -> matcher`
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::registration(format!(
                "a filter must be a map of attribute to matcher, found {value}"
            )));
        };
        let constraints = map
            .into_iter()
            .map(|(attr, raw)| Matcher::for_attribute(&attr, raw).map(|m| (attr, m)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { constraints })
    }

    /// Evaluate against a node; every constraint must hold
    ///
    /// An attribute missing from the node fails its constraint.
    pub fn matches(&self, node: &Node) -> bool {
        self.constraints.iter().all(|(attr, matcher)| {
            node.read(attr)
                .is_some_and(|actual| matcher.matches(actual))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Number of constraints; more constraints rank ahead of fewer
    pub fn specificity(&self) -> usize {
        self.constraints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Matcher)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .constraints
            .iter()
            .map(|(attr, matcher)| format!("{attr}: {matcher}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::new();
        assert!(filter.matches(&Node::new()));
        assert!(filter.matches(&Node::new().with("os", "linux")));
        assert_eq!(filter.to_string(), "{}");
    }

    #[test]
    fn test_equality_and_missing_attribute() {
        let filter = Filter::new().os("blarghle");
        assert!(filter.matches(&Node::new().with("os", "blarghle")));
        assert!(!filter.matches(&Node::new().with("os", "linux")));
        assert!(!filter.matches(&Node::new()));
    }

    #[test]
    fn test_conjunction() {
        let filter = Filter::new().os("linux").platform_family("debian");
        let node = Node::new().with("os", "linux");
        assert!(!filter.matches(&node));
        assert!(filter.matches(&node.with("platform_family", "debian")));
        assert_eq!(filter.specificity(), 2);
    }

    #[test]
    fn test_membership() {
        let filter = Filter::new().one_of("platform_family", ["rhel", "fedora", "amazon"]);
        assert!(filter.matches(&Node::new().with("platform_family", "fedora")));
        assert!(!filter.matches(&Node::new().with("platform_family", "debian")));
    }

    #[test]
    fn test_version_range() {
        let filter = Filter::new()
            .platform("mac_os_x")
            .version("platform_version", ">= 10.10")
            .unwrap();
        let node = Node::new().with("platform", "mac_os_x");
        assert!(filter.matches(&node.clone().with("platform_version", "10.15.7")));
        assert!(!filter.matches(&node.clone().with("platform_version", "10.9")));
        assert!(!filter.matches(&node.with("platform_version", true)));
    }

    #[test]
    fn test_malformed_version_is_registration_error() {
        let err = Filter::new().version("platform_version", ">= 1.x!").unwrap_err();
        assert!(matches!(err, Error::Registration { .. }));
    }

    #[test]
    fn test_from_value() {
        let filter = Filter::from_value(json!({
            "os": "linux",
            "platform_family": ["debian", "ubuntu"],
            "platform_version": "~> 22.04",
        }))
        .unwrap();
        let node = Node::new()
            .with("os", "linux")
            .with("platform_family", "ubuntu")
            .with("platform_version", "22.10");
        assert!(filter.matches(&node));

        assert!(Filter::from_value(json!("linux")).is_err());
        assert!(Filter::from_value(json!({"os": {"nested": true}})).is_err());
        assert!(Filter::from_value(json!({"os": [["linux"]]})).is_err());
        assert!(Filter::from_value(json!({"platform_version": ">= nope!"})).is_err());
    }

    #[test]
    fn test_exact_version_uses_version_ordering() {
        let node = Node::new().with("platform_version", "10.4.0");
        let filter = Filter::from_value(json!({"platform_version": "10.4"})).unwrap();
        assert!(filter.matches(&node));
        assert!(!filter.matches(&Node::new().with("platform_version", "10.5")));

        assert!(Filter::new().with("platform_version", "10.4").matches(&node));
        assert!(Filter::from_value(json!({"platform_version": 10.4})).unwrap().matches(&node));
        assert!(Filter::from_value(json!({"kernel.os_version": "5.15"}))
            .unwrap()
            .matches(&Node::new().with("kernel.os_version", "5.15.0")));

        // Plain attributes keep string equality.
        assert!(!Filter::new().platform("10.4").matches(&Node::new().with("platform", "10.4.0")));
    }

    #[test]
    fn test_equivalent_filters_compare_equal() {
        let a = Filter::new().os("linux").platform("ubuntu");
        let b = Filter::new().platform("ubuntu").os("linux");
        assert_eq!(a, b);
        assert_ne!(a, Filter::new().os("linux"));
    }

    #[test]
    fn test_display() {
        let filter = Filter::new().platform("foo");
        assert_eq!(filter.to_string(), "{platform: \"foo\"}");
    }
}
