//! Resource class descriptors and resource instances
//!
//! A [`ResourceClass`] is the static description a recipe summons by DSL
//! name: its declared actions, declared attributes with defaults, an optional
//! `provides?` callback and an optional pinned provider. Classes are cheap to
//! clone and compare by identity.
//!
//! A [`Resource`] is one recipe invocation of a class. Recipe blocks never
//! touch it directly; they get a [`ResourceBuilder`] which only exposes the
//! attributes and actions the class declares.
//!
//! # Example
//!
//! ```ignore
//! use declarative::{ResourceClass, Resource, DslName};
//!
//! let file = ResourceClass::builder("Sous::Resource::File")
//!     .actions(["create", "delete"])
//!     .attribute("path")
//!     .attribute_default("mode", "0644")
//!     .build()?;
//!
//! let mut resource = Resource::new(file, "/etc/motd", DslName::new("file")?);
//! resource.builder().set("path", "/etc/motd")?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::priority::{ClassHandle, ClassId};
use crate::provider::ProviderClass;
use crate::types::{Action, DslName, ResourceState};

/// `provides?` callback of a resource class
pub type ResourceProvidesFn = dyn Fn(&Node, &DslName) -> bool + Send + Sync;

struct ResourceClassInner {
    id: ClassId,
    name: String,
    actions: Vec<Action>,
    default_action: Action,
    attributes: BTreeMap<String, Option<Value>>,
    provides: Option<Arc<ResourceProvidesFn>>,
    provider: Option<ProviderClass>,
}

/// Handle to a resource class descriptor
#[derive(Clone)]
pub struct ResourceClass(Arc<ResourceClassInner>);

impl ResourceClass {
    pub fn builder(name: impl Into<String>) -> ResourceClassBuilder {
        ResourceClassBuilder::new(name)
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    /// Fully-qualified class name, e.g. `Sous::Resource::AptPackage`
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Last `::` segment of the class name
    pub fn short_name(&self) -> &str {
        short_name(&self.0.name)
    }

    /// Allowed actions: `nothing` followed by the declared actions
    pub fn actions(&self) -> Vec<Action> {
        std::iter::once(Action::nothing())
            .chain(self.0.actions.iter().cloned())
            .collect()
    }

    /// Actions declared on the class itself, without `nothing`
    pub fn declared_actions(&self) -> &[Action] {
        &self.0.actions
    }

    pub fn default_action(&self) -> &Action {
        &self.0.default_action
    }

    pub fn allows_action(&self, action: &Action) -> bool {
        action.is_nothing() || self.0.actions.contains(action)
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.0.attributes.contains_key(attribute)
    }

    /// Declared attribute names in sorted order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.0.attributes.keys().map(String::as_str)
    }

    /// The class's `provides?` callback, if it declares one
    pub fn provides_callback(&self) -> Option<&ResourceProvidesFn> {
        self.0.provides.as_deref()
    }

    /// Provider class pinned on this resource class
    pub fn pinned_provider(&self) -> Option<&ProviderClass> {
        self.0.provider.as_ref()
    }
}

impl ClassHandle for ResourceClass {
    fn class_id(&self) -> ClassId {
        self.0.id
    }

    fn class_name(&self) -> &str {
        &self.0.name
    }
}

impl PartialEq for ResourceClass {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ResourceClass {}

impl fmt::Debug for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClass")
            .field("name", &self.0.name)
            .field("actions", &self.0.actions)
            .field("default_action", &self.0.default_action)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

pub(crate) fn short_name(class_name: &str) -> &str {
    class_name.rsplit("::").next().unwrap_or(class_name)
}

/// Builder for [`ResourceClass`]
///
/// Names are validated by [`build`](Self::build), so a bad declaration fails
/// with a registration error when the class is defined.
pub struct ResourceClassBuilder {
    name: String,
    actions: Vec<String>,
    default_action: Option<String>,
    attributes: BTreeMap<String, Option<Value>>,
    provides: Option<Arc<ResourceProvidesFn>>,
    provider: Option<ProviderClass>,
}

impl ResourceClassBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            default_action: None,
            attributes: BTreeMap::new(),
            provides: None,
            provider: None,
        }
    }

    /// Start from a copy of `parent`'s declarations
    ///
    /// The parent is left untouched; later `actions` calls replace the copied
    /// list on the subclass only.
    pub fn extends(mut self, parent: &ResourceClass) -> Self {
        self.actions = parent.0.actions.iter().map(|a| a.to_string()).collect();
        self.default_action = Some(parent.0.default_action.to_string());
        self.attributes = parent.0.attributes.clone();
        self.provides = parent.0.provides.clone();
        self.provider = parent.0.provider.clone();
        self
    }

    /// Replace the declared actions
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        if self
            .default_action
            .as_ref()
            .is_some_and(|d| !self.actions.contains(d))
        {
            self.default_action = None;
        }
        self
    }

    pub fn default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = Some(action.into());
        self
    }

    /// Declare an attribute with no default
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), None);
        self
    }

    pub fn attribute_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), Some(default.into()));
        self
    }

    /// Decide eligibility with a callback instead of registration filters
    pub fn provides_when<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Node, &DslName) -> bool + Send + Sync + 'static,
    {
        self.provides = Some(Arc::new(callback));
        self
    }

    /// Always use `provider` for this resource
    pub fn provider(mut self, provider: ProviderClass) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<ResourceClass> {
        if self.name.trim().is_empty() {
            return Err(Error::registration("resource class name cannot be empty"));
        }

        let mut actions = Vec::with_capacity(self.actions.len());
        for raw in self.actions {
            let action = Action::new(raw)?;
            if !action.is_nothing() && !actions.contains(&action) {
                actions.push(action);
            }
        }

        // An explicit default action is allowed even if not listed.
        let default_action = match self.default_action {
            Some(raw) => {
                let action = Action::new(raw)?;
                if !action.is_nothing() && !actions.contains(&action) {
                    actions.push(action.clone());
                }
                action
            }
            None => actions.first().cloned().unwrap_or_else(Action::nothing),
        };

        for attribute in self.attributes.keys() {
            if DslName::new(attribute.as_str()).is_err() {
                return Err(Error::registration(format!(
                    "invalid attribute name '{attribute}' on {}",
                    self.name
                )));
            }
        }

        log::trace!("Built resource class {}", self.name);
        Ok(ResourceClass(Arc::new(ResourceClassInner {
            id: ClassId::next(),
            name: self.name,
            actions,
            default_action,
            attributes: self.attributes,
            provides: self.provides,
            provider: self.provider,
        })))
    }
}

/// One recipe invocation of a resource class
#[derive(Debug, Clone)]
pub struct Resource {
    class: ResourceClass,
    name: String,
    declared_type: DslName,
    attributes: BTreeMap<String, Value>,
    actions: Vec<Action>,
    state: ResourceState,
    updated_by_last_action: bool,
}

impl Resource {
    /// Instantiate `class` with attribute defaults and the default action
    pub fn new(class: ResourceClass, name: impl Into<String>, declared_type: DslName) -> Self {
        let attributes = class
            .0
            .attributes
            .iter()
            .filter_map(|(k, v)| v.clone().map(|v| (k.clone(), v)))
            .collect();
        let actions = vec![class.default_action().clone()];
        Self {
            class,
            name: name.into(),
            declared_type,
            attributes,
            actions,
            state: ResourceState::Declared,
            updated_by_last_action: false,
        }
    }

    pub fn class(&self) -> &ResourceClass {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// DSL name the resource was summoned with
    pub fn declared_type(&self) -> &DslName {
        &self.declared_type
    }

    /// `nothing` plus the class's declared actions
    pub fn allowed_actions(&self) -> Vec<Action> {
        self.class.actions()
    }

    /// Actions the recipe asked for, in order
    pub fn requested_actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn updated_by_last_action(&self) -> bool {
        self.updated_by_last_action
    }

    /// Builder view used by recipe blocks
    pub fn builder(&mut self) -> ResourceBuilder<'_> {
        ResourceBuilder { resource: self }
    }

    pub(crate) fn check_action(&self, action: &Action) -> Result<()> {
        if self.class.allows_action(action) {
            return Ok(());
        }
        let allowed: Vec<String> = self
            .allowed_actions()
            .iter()
            .map(ToString::to_string)
            .collect();
        Err(Error::InvalidAction {
            resource: self.to_string(),
            action: action.to_string(),
            allowed: allowed.join(", "),
        })
    }

    pub(crate) fn mark_compiled(&mut self) {
        if self.state == ResourceState::Declared {
            self.state = ResourceState::Compiled;
        }
    }

    pub(crate) fn begin_converge(&mut self) -> Result<()> {
        if self.state != ResourceState::Compiled {
            return Err(Error::InvalidState {
                resource: self.to_string(),
                state: self.state.to_string(),
            });
        }
        self.state = ResourceState::Converging;
        Ok(())
    }

    pub(crate) fn finish_converge(&mut self, updated: bool) {
        self.state = if updated {
            ResourceState::Updated
        } else {
            ResourceState::Unchanged
        };
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = ResourceState::Failed;
    }

    pub(crate) fn set_updated_by_last_action(&mut self, updated: bool) {
        self.updated_by_last_action = updated;
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.declared_type, self.name)
    }
}

/// The view of a resource a recipe block gets
///
/// Only attributes and actions declared by the class can be set.
#[derive(Debug)]
pub struct ResourceBuilder<'a> {
    resource: &'a mut Resource,
}

impl ResourceBuilder<'_> {
    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.resource.attributes.get(attribute)
    }

    /// Assign a declared attribute
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) -> Result<&mut Self> {
        if !self.resource.class.has_attribute(attribute) {
            return Err(Error::UnknownAttribute {
                resource: self.resource.to_string(),
                attribute: attribute.to_string(),
            });
        }
        self.resource
            .attributes
            .insert(attribute.to_string(), value.into());
        Ok(self)
    }

    /// Request a single action, replacing the default
    pub fn action(&mut self, action: &str) -> Result<&mut Self> {
        self.actions([action])
    }

    /// Request several actions, run in order
    pub fn actions<'s>(&mut self, actions: impl IntoIterator<Item = &'s str>) -> Result<&mut Self> {
        let mut requested = Vec::new();
        for raw in actions {
            let action = Action::new(raw)?;
            self.resource.check_action(&action)?;
            requested.push(action);
        }
        self.resource.actions = requested;
        Ok(self)
    }
}

/// A recipe block expressed as data
///
/// ```toml
/// action = ["install"]
///
/// [attributes]
/// version = "1.2.3"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub action: Vec<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action.push(action.into());
        self
    }

    /// Replay the block against a builder
    pub fn apply(&self, builder: &mut ResourceBuilder<'_>) -> Result<()> {
        for (attribute, value) in &self.attributes {
            builder.set(attribute, value.clone())?;
        }
        if !self.action.is_empty() {
            builder.actions(self.action.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dsl(name: &str) -> DslName {
        DslName::new(name).unwrap()
    }

    #[test]
    fn test_default_action_is_first_declared() {
        let class = ResourceClass::builder("Test::Thing")
            .actions(["create", "delete"])
            .build()
            .unwrap();
        assert_eq!(class.default_action().as_str(), "create");

        let bare = ResourceClass::builder("Test::Bare").build().unwrap();
        assert!(bare.default_action().is_nothing());
        assert_eq!(bare.actions(), vec![Action::nothing()]);
    }

    #[test]
    fn test_explicit_default_action_is_allowed() {
        let class = ResourceClass::builder("Test::Thing")
            .actions(["create"])
            .default_action("run")
            .build()
            .unwrap();
        assert!(class.allows_action(&Action::new("run").unwrap()));
        assert_eq!(class.default_action().as_str(), "run");
    }

    #[test]
    fn test_subclass_actions_do_not_touch_parent() {
        let parent = ResourceClass::builder("Test::Parent")
            .actions(["create"])
            .build()
            .unwrap();
        let child = ResourceClass::builder("Test::Child")
            .extends(&parent)
            .actions(["delete"])
            .build()
            .unwrap();

        let names = |class: &ResourceClass| -> Vec<String> {
            class.actions().iter().map(ToString::to_string).collect()
        };
        assert_eq!(names(&parent), vec!["nothing", "create"]);
        assert_eq!(names(&child), vec!["nothing", "delete"]);
        assert_eq!(child.default_action().as_str(), "delete");
        assert_ne!(parent, child);
    }

    #[test]
    fn test_extends_copies_attributes() {
        let parent = ResourceClass::builder("Test::Parent")
            .attribute_default("mode", "0644")
            .build()
            .unwrap();
        let child = ResourceClass::builder("Test::Child")
            .extends(&parent)
            .attribute("owner")
            .build()
            .unwrap();
        assert!(child.has_attribute("mode"));
        assert!(child.has_attribute("owner"));
        assert!(!parent.has_attribute("owner"));
    }

    #[test]
    fn test_invalid_declarations() {
        assert!(ResourceClass::builder("").build().is_err());
        assert!(ResourceClass::builder("X").actions(["Create"]).build().is_err());
        assert!(ResourceClass::builder("X").attribute("Bad-Name").build().is_err());
    }

    #[test]
    fn test_instance_defaults() {
        let class = ResourceClass::builder("Test::File")
            .actions(["create"])
            .attribute("path")
            .attribute_default("mode", "0644")
            .build()
            .unwrap();
        let resource = Resource::new(class, "motd", dsl("file"));
        assert_eq!(resource.to_string(), "file[motd]");
        assert_eq!(resource.attribute_str("mode"), Some("0644"));
        assert!(resource.attribute("path").is_none());
        assert_eq!(resource.requested_actions(), &[Action::new("create").unwrap()]);
        assert_eq!(resource.state(), ResourceState::Declared);
    }

    #[test]
    fn test_builder_exposes_declared_attributes_only() {
        let class = ResourceClass::builder("Test::File")
            .actions(["create"])
            .attribute("path")
            .build()
            .unwrap();
        let mut resource = Resource::new(class, "motd", dsl("file"));
        let mut builder = resource.builder();
        builder.set("path", "/etc/motd").unwrap();

        let err = builder.set("color", "blue").unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute { attribute, .. } if attribute == "color"));

        let err = builder.action("explode").unwrap_err();
        assert!(matches!(err, Error::InvalidAction { allowed, .. } if allowed == "nothing, create"));

        builder.action("nothing").unwrap();
        assert_eq!(resource.attribute("path"), Some(&json!("/etc/motd")));
        assert!(resource.requested_actions()[0].is_nothing());
    }

    #[test]
    fn test_lifecycle_requires_compiled() {
        let class = ResourceClass::builder("Test::Thing").build().unwrap();
        let mut resource = Resource::new(class, "x", dsl("thing"));
        assert!(matches!(
            resource.begin_converge(),
            Err(Error::InvalidState { .. })
        ));

        resource.mark_compiled();
        resource.begin_converge().unwrap();
        assert_eq!(resource.state(), ResourceState::Converging);
        resource.finish_converge(false);
        assert_eq!(resource.state(), ResourceState::Unchanged);
        assert!(resource.begin_converge().is_err());
    }

    #[test]
    fn test_block_from_toml() {
        let block: Block = toml::from_str(
            r#"
            action = ["install"]

            [attributes]
            version = "1.2.3"
            "#,
        )
        .unwrap();

        let class = ResourceClass::builder("Test::Package")
            .actions(["install", "remove"])
            .attribute("version")
            .build()
            .unwrap();
        let mut resource = Resource::new(class, "git", dsl("package"));
        block.apply(&mut resource.builder()).unwrap();
        assert_eq!(resource.attribute_str("version"), Some("1.2.3"));
        assert_eq!(resource.requested_actions()[0].as_str(), "install");
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Sous::Resource::AptPackage"), "AptPackage");
        assert_eq!(short_name("Plain"), "Plain");
    }
}
