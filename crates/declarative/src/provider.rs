//! Providers realize a resource's desired state on the current host
//!
//! A [`ProviderClass`] is what the Provider Registry stores: a name, a
//! factory for fresh [`Provider`] instances, an optional `supports?`
//! predicate and an optional `provides?` callback. A new provider instance is
//! created for every action run.

use std::fmt;
use std::sync::Arc;

use crate::context::ActionContext;
use crate::error::Result;
use crate::node::Node;
use crate::priority::{ClassHandle, ClassId};
use crate::resource::{Resource, short_name};
use crate::types::{Action, ApplyResult};

/// Imperative half of a resource
///
/// # Example
///
/// ```ignore
/// struct LogProvider;
///
/// impl Provider for LogProvider {
///     fn run_action(
///         &mut self,
///         _action: &Action,
///         resource: &Resource,
///         _ctx: &ActionContext<'_>,
///     ) -> Result<ApplyResult> {
///         log::info!("{}", resource.name());
///         Ok(ApplyResult::Modified)
///     }
/// }
/// ```
pub trait Provider: Send {
    /// Inspect the system before an action runs
    ///
    /// Called for every action, including `nothing`.
    fn load_current_resource(&mut self, _resource: &Resource, _ctx: &ActionContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Run one action against the system
    ///
    /// Never called for `nothing`. Providers should honor
    /// `ctx.why_run()` and return `ApplyResult::Skipped` instead of changing
    /// anything.
    fn run_action(
        &mut self,
        action: &Action,
        resource: &Resource,
        ctx: &ActionContext<'_>,
    ) -> Result<ApplyResult>;
}

type ProviderFactory = dyn Fn() -> Box<dyn Provider> + Send + Sync;

/// `supports?` predicate of a provider class
pub type SupportsFn = dyn Fn(&Resource, &Action) -> bool + Send + Sync;

/// `provides?` callback of a provider class
pub type ProviderProvidesFn = dyn Fn(&Node, &Resource) -> bool + Send + Sync;

struct ProviderClassInner {
    id: ClassId,
    name: String,
    factory: Box<ProviderFactory>,
    supports: Option<Box<SupportsFn>>,
    provides: Option<Box<ProviderProvidesFn>>,
}

/// Handle to a provider class descriptor
#[derive(Clone)]
pub struct ProviderClass(Arc<ProviderClassInner>);

impl ProviderClass {
    /// Start building a provider class
    ///
    /// `factory` is called once per action to create a fresh provider.
    pub fn builder<F>(name: impl Into<String>, factory: F) -> ProviderClassBuilder
    where
        F: Fn() -> Box<dyn Provider> + Send + Sync + 'static,
    {
        ProviderClassBuilder {
            name: name.into(),
            factory: Box::new(factory),
            supports: None,
            provides: None,
        }
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Last `::` segment of the class name
    pub fn short_name(&self) -> &str {
        short_name(&self.0.name)
    }

    /// Ask whether this provider can run `action` for `resource`
    ///
    /// Classes without a predicate support everything.
    pub fn supports(&self, resource: &Resource, action: &Action) -> bool {
        self.0
            .supports
            .as_ref()
            .is_none_or(|supports| supports(resource, action))
    }

    pub fn provides_callback(&self) -> Option<&ProviderProvidesFn> {
        self.0.provides.as_deref()
    }

    /// Create a fresh provider instance
    pub fn instantiate(&self) -> Box<dyn Provider> {
        (self.0.factory)()
    }
}

impl ClassHandle for ProviderClass {
    fn class_id(&self) -> ClassId {
        self.0.id
    }

    fn class_name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for ProviderClass {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ProviderClass {}

impl fmt::Debug for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClass")
            .field("name", &self.0.name)
            .field("supports", &self.0.supports.is_some())
            .field("provides", &self.0.provides.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for [`ProviderClass`]
pub struct ProviderClassBuilder {
    name: String,
    factory: Box<ProviderFactory>,
    supports: Option<Box<SupportsFn>>,
    provides: Option<Box<ProviderProvidesFn>>,
}

impl ProviderClassBuilder {
    pub fn supports<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Resource, &Action) -> bool + Send + Sync + 'static,
    {
        self.supports = Some(Box::new(predicate));
        self
    }

    /// Decide eligibility with a callback instead of registration filters
    pub fn provides_when<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Node, &Resource) -> bool + Send + Sync + 'static,
    {
        self.provides = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> ProviderClass {
        ProviderClass(Arc::new(ProviderClassInner {
            id: ClassId::next(),
            name: self.name,
            factory: self.factory,
            supports: self.supports,
            provides: self.provides,
        }))
    }
}
