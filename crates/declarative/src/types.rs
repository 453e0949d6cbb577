//! Core types shared by the registries and the dispatcher

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::error::{Error, Result};

fn is_symbol(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Short identifier a recipe uses to summon a resource, e.g. `package`
///
/// Drawn from `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DslName(String);

impl DslName {
    /// Validate and wrap a DSL name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_symbol(&name) {
            return Err(Error::registration(format!(
                "invalid DSL name '{name}': expected [a-z0-9_]+"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DslName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DslName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DslName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DslName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DslName> for String {
    fn from(value: DslName) -> Self {
        value.0
    }
}

/// An action a resource can be asked to perform, e.g. `create`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Action(String);

impl Action {
    /// Name of the action every resource allows
    pub const NOTHING: &'static str = "nothing";

    /// Validate and wrap an action name
    pub fn new(action: impl Into<String>) -> Result<Self> {
        let action = action.into();
        if !is_symbol(&action) {
            return Err(Error::registration(format!(
                "invalid action '{action}': expected [a-z0-9_]+"
            )));
        }
        Ok(Self(action))
    }

    /// The `nothing` action
    pub fn nothing() -> Self {
        Self(Self::NOTHING.to_string())
    }

    pub fn is_nothing(&self) -> bool {
        self.0 == Self::NOTHING
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Action {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Action {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        value.0
    }
}

/// Lifecycle of a resource instance
///
/// `Declared -> Compiled` once the recipe block ran, `Compiled -> Converging`
/// when actions start, then `Updated` or `Unchanged`. Any state may move to
/// `Failed`. `Updated`, `Unchanged` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Declared,
    Compiled,
    Converging,
    Updated,
    Unchanged,
    Failed,
}

impl ResourceState {
    /// Check if no further transition (other than to `Failed`) is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Updated | Self::Unchanged | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Compiled => "compiled",
            Self::Converging => "converging",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one provider action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Action was skipped (why-run, guard)
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Summary of a converge run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergeSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ConvergeSummary {
    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.skipped
    }

    /// Add a resource outcome to the summary
    ///
    /// A resource counts as skipped only when every one of its actions was.
    pub fn add_resource(&mut self, results: &[ApplyResult]) {
        if results.iter().any(ApplyResult::is_change) {
            self.updated += 1;
        } else if !results.is_empty()
            && results
                .iter()
                .all(|r| matches!(r, ApplyResult::Skipped { .. }))
        {
            self.skipped += 1;
        } else {
            self.unchanged += 1;
        }
    }
}
