//! Structured warnings for ambiguous or deprecated declarations
//!
//! Registries and the dispatcher never log ambiguity directly; they build a
//! [`Warning`] and hand it to the [`WarningBus`]. The bus either delivers it to
//! its sinks or, when `treat_deprecation_warnings_as_errors` is set, turns it
//! into [`Error::Deprecation`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{Error, Result};

/// Kinds of warning events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A registration will never win because an equivalent one precedes it
    ShadowedRegistration,
    /// A `provides?` callback claimed a name the class never registered
    ProvidesWithoutRegister,
    /// A class was found by naming convention instead of registration
    LegacyNamespaceLookup,
    /// A deprecated DSL name was used in a recipe
    DeprecatedDsl,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShadowedRegistration => "shadowed_registration",
            Self::ProvidesWithoutRegister => "provides_without_register",
            Self::LegacyNamespaceLookup => "legacy_namespace_lookup",
            Self::DeprecatedDsl => "deprecated_dsl",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning event with its structured fields and rendered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub fields: BTreeMap<&'static str, String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            message: message.into(),
        }
    }

    /// Attach a structured field
    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.insert(key, value.to_string());
        self
    }

    /// Read a structured field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// A later registration is shadowed by an equivalent earlier one
    ///
    /// `noun` is `"resource"` or `"provider"`.
    pub fn shadowed(noun: &str, name: &str, winner: &str, loser: &str, filter: &str) -> Self {
        Self::new(
            WarningKind::ShadowedRegistration,
            format!(
                "You declared a new {noun} {loser} for resource {name}, but it comes \
                 alphabetically after {winner} and has the same filters ({filter}), so it \
                 will not be used. Use override: true if you want to use it for {name}."
            ),
        )
        .field("winner", winner)
        .field("loser", loser)
        .field("name", name)
        .field("filter", filter)
    }

    /// A `provides?` callback answered for a name that was never registered
    pub fn provides_without_register(class: &str, name: &str) -> Self {
        Self::new(
            WarningKind::ProvidesWithoutRegister,
            format!(
                "{class}.provides? returned true when asked if it provides DSL {name}, \
                 but provides :{name} was never called!"
            ),
        )
        .field("class", class)
        .field("name", name)
    }

    /// A class was reached through the legacy naming convention
    ///
    /// `keyword` is the declaration the class is missing, `resource_name` or
    /// `provides`.
    pub fn legacy_lookup(class: &str, keyword: &str, name: &str) -> Self {
        Self::new(
            WarningKind::LegacyNamespaceLookup,
            format!(
                "Class {class} does not declare '{keyword} :{name}'. Finding it by class \
                 name is deprecated; declare the name explicitly."
            ),
        )
        .field("class", class)
        .field("name", name)
    }

    /// A deprecated DSL name was dispatched
    pub fn deprecated_dsl(name: &str, replacement: Option<&str>) -> Self {
        let message = match replacement {
            Some(r) => format!("The {name} resource is deprecated; use {r} instead."),
            None => format!("The {name} resource is deprecated."),
        };
        let warning = Self::new(WarningKind::DeprecatedDsl, message).field("name", name);
        match replacement {
            Some(r) => warning.field("replacement", r),
            None => warning,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Destination for warnings
pub trait WarningSink: Send + Sync {
    fn emit(&self, warning: &Warning);
}

/// Sink writing warnings through the `log` facade
pub struct LogSink;

impl WarningSink for LogSink {
    fn emit(&self, warning: &Warning) {
        log::warn!("{}", warning.message);
    }
}

/// Sink that keeps every warning, for inspection
#[derive(Default)]
pub struct RecordingSink {
    warnings: Mutex<Vec<Warning>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded warnings of one kind
    pub fn of_kind(&self, kind: WarningKind) -> Vec<Warning> {
        self.warnings()
            .into_iter()
            .filter(|w| w.kind == kind)
            .collect()
    }

    /// Drain recorded warnings
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_empty(&self) -> bool {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl WarningSink for RecordingSink {
    fn emit(&self, warning: &Warning) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning.clone());
    }
}

/// The single soft-failure channel of the registries
pub struct WarningBus {
    sinks: RwLock<Vec<Arc<dyn WarningSink>>>,
    treat_as_errors: AtomicBool,
}

impl WarningBus {
    /// Bus delivering to the log
    pub fn new() -> Self {
        Self::with_sinks(vec![Arc::new(LogSink)])
    }

    /// Bus with no sinks; warnings are dropped unless escalated
    pub fn silent() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Arc<dyn WarningSink>>) -> Self {
        Self {
            sinks: RwLock::new(sinks),
            treat_as_errors: AtomicBool::new(false),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn WarningSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn set_treat_as_errors(&self, enabled: bool) {
        self.treat_as_errors.store(enabled, Ordering::SeqCst);
    }

    pub fn treats_as_errors(&self) -> bool {
        self.treat_as_errors.load(Ordering::SeqCst)
    }

    /// Fail with `Error::Deprecation` if warnings are escalated
    pub fn check(&self, warning: &Warning) -> Result<()> {
        if self.treats_as_errors() {
            return Err(Error::Deprecation {
                kind: warning.kind,
                message: warning.message.clone(),
            });
        }
        Ok(())
    }

    /// Deliver a warning to every sink without checking escalation
    pub fn emit(&self, warning: &Warning) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.emit(warning);
        }
    }

    /// Raise or deliver a warning
    pub fn warn(&self, warning: Warning) -> Result<()> {
        self.check(&warning)?;
        self.emit(&warning);
        Ok(())
    }
}

impl Default for WarningBus {
    fn default() -> Self {
        Self::new()
    }
}
