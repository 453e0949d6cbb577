//! Resource and provider registries
//!
//! [`ResourceRegistry`] maps DSL names to resource classes and
//! [`ProviderRegistry`] maps them to provider classes, each through a
//! [`PriorityMap`]. [`Registry`] bundles both and the legacy namespace behind
//! a single readers-writer lock next to the [`WarningBus`]; registration takes
//! the write lock and resolution the read lock. [`Registry::global`] is the process-wide instance.
//!
//! Resolution copies the candidates it needs and releases the lock before it
//! runs user callbacks or warning sinks, so those may declare classes. Registration delivers its
//! warnings after the write lock is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::legacy::{LegacyNamespace, class_name_for};
use crate::node::Node;
use crate::priority::{ClassHandle, ClassId, Entry, Flags, PriorityMap};
use crate::provider::ProviderClass;
use crate::resource::{Resource, ResourceClass};
use crate::types::{Action, DslName};
use crate::warnings::{Warning, WarningBus};

/// One `provides` declaration: a DSL name, its filter and flags
#[derive(Debug, Clone, PartialEq)]
pub struct Provides {
    pub name: String,
    pub filter: Filter,
    pub flags: Flags,
}

impl Provides {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: Filter::new(),
            flags: Flags::NONE,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DeclarationStep {
    ResourceName(Option<String>),
    Provides(Provides),
}

/// The naming statements of a resource class body, replayed in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDeclaration {
    steps: Vec<DeclarationStep>,
}

impl ResourceDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// `resource_name :name`
    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.steps
            .push(DeclarationStep::ResourceName(Some(name.into())));
        self
    }

    /// `resource_name nil`
    pub fn no_resource_name(mut self) -> Self {
        self.steps.push(DeclarationStep::ResourceName(None));
        self
    }

    /// `provides :name, filter`
    pub fn provides(mut self, provides: Provides) -> Self {
        self.steps.push(DeclarationStep::Provides(provides));
        self
    }
}

/// The `provides` statements of a provider class body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderDeclaration {
    provides: Vec<Provides>,
}

impl ProviderDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provides(mut self, provides: Provides) -> Self {
        self.provides.push(provides);
        self
    }
}

/// A registration as shown by introspection
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_name: String,
    pub filter: Filter,
    pub flags: Flags,
    /// The class decides eligibility with a `provides?` callback
    pub has_callback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum PrimaryName {
    #[default]
    Unset,
    Named(DslName),
    Cleared,
}

#[derive(Debug, Default)]
struct ClassState {
    primary: PrimaryName,
    /// Name holding the implicit registration created by `resource_name`
    auto: Option<DslName>,
    /// Names given through explicit `provides`
    provided: BTreeSet<DslName>,
}

/// Check a pending registration for shadowing before anything is inserted
///
/// The returned warning has already passed escalation and only needs to be
/// emitted once the registration is in place.
fn shadow_warning<C: ClassHandle>(
    map: &PriorityMap<C>,
    noun: &str,
    name: &DslName,
    class: &C,
    filter: &Filter,
    flags: Flags,
    bus: &WarningBus,
) -> Result<Option<Warning>> {
    let Some(shadow) = map.shadow_for(name, class, filter, flags) else {
        return Ok(None);
    };
    let warning = Warning::shadowed(
        noun,
        name.as_str(),
        &shadow.winner,
        &shadow.loser,
        &shadow.filter,
    );
    bus.check(&warning)?;
    Ok(Some(warning))
}

/// Resource classes by DSL name
#[derive(Default)]
pub struct ResourceRegistry {
    map: PriorityMap<ResourceClass>,
    classes: BTreeMap<ClassId, (ResourceClass, ClassState)>,
    deprecated: BTreeMap<DslName, Option<String>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self, class: &ResourceClass) -> &mut ClassState {
        &mut self
            .classes
            .entry(class.id())
            .or_insert_with(|| (class.clone(), ClassState::default()))
            .1
    }

    fn state(&self, class: &ResourceClass) -> Option<&ClassState> {
        self.classes.get(&class.id()).map(|(_, state)| state)
    }

    /// Make a class known so its `provides?` callback takes part in resolution
    pub fn declare(&mut self, class: &ResourceClass) {
        self.state_mut(class);
    }

    /// Register `class` under `dsl_name` (`provides`)
    ///
    /// A filtered or flagged registration under the class's own primary name
    /// replaces the implicit unfiltered one, so the filter governs that name.
    /// An unfiltered one under that name changes nothing.
    ///
    /// Returns the shadowing warning to deliver, already checked for
    /// escalation.
    pub fn register(
        &mut self,
        class: &ResourceClass,
        dsl_name: &str,
        filter: Filter,
        flags: Flags,
        bus: &WarningBus,
    ) -> Result<Option<Warning>> {
        let name = DslName::new(dsl_name)?;
        let unfiltered = filter.is_empty() && flags.is_empty();
        if unfiltered && self.state(class).is_some_and(|s| s.auto.as_ref() == Some(&name)) {
            log::debug!("Resource {} is already named {name}", class.name());
            return Ok(None);
        }
        let warning = shadow_warning(&self.map, "resource", &name, class, &filter, flags, bus)?;

        let state = self.state_mut(class);
        let drop_auto = !unfiltered && state.auto.as_ref() == Some(&name);
        if drop_auto {
            state.auto = None;
        }
        state.provided.insert(name.clone());

        if drop_auto {
            self.map.remove_auto(name.as_str(), class.id());
        }
        log::debug!(
            "Registering resource {} as {name} {filter}{}",
            class.name(),
            if flags.overrides { " (override)" } else { "" }
        );
        self.map.insert(name, class.clone(), filter, flags);
        Ok(warning)
    }

    /// Set or clear the class's canonical name (`resource_name`)
    ///
    /// The implicit registration under the previous primary name is dropped;
    /// explicit `provides` registrations are kept. A name the class already
    /// `provides` explicitly gets no implicit registration.
    pub fn set_primary_name(
        &mut self,
        class: &ResourceClass,
        dsl_name: Option<&str>,
        bus: &WarningBus,
    ) -> Result<Option<Warning>> {
        let name = dsl_name.map(DslName::new).transpose()?;
        let state = self.state(class);
        let old_auto = state.and_then(|s| s.auto.clone());
        let add_auto = name
            .clone()
            .filter(|n| !state.is_some_and(|s| s.provided.contains(n)));

        let warning = match &add_auto {
            Some(n) if old_auto.as_ref() != Some(n) => shadow_warning(
                &self.map,
                "resource",
                n,
                class,
                &Filter::new(),
                Flags::NONE,
                bus,
            )?,
            _ => None,
        };

        if let Some(old) = &old_auto {
            self.map.remove_auto(old.as_str(), class.id());
        }
        let state = self.state_mut(class);
        state.auto = add_auto.clone();
        state.primary = match name {
            Some(n) => PrimaryName::Named(n),
            None => PrimaryName::Cleared,
        };
        match &add_auto {
            Some(n) => log::debug!("Resource {} is named {n}", class.name()),
            None => log::debug!("Resource {} has no implicit name", class.name()),
        }
        if let Some(n) = add_auto {
            self.map.insert_auto(n, class.clone());
        }
        Ok(warning)
    }

    /// The canonical name the class declared, if any
    pub fn primary_name(&self, class: &ResourceClass) -> Option<&DslName> {
        match &self.state(class)?.primary {
            PrimaryName::Named(name) => Some(name),
            PrimaryName::Unset | PrimaryName::Cleared => None,
        }
    }

    /// Resolve a DSL name to a resource class for `node`
    ///
    /// Order: registered candidates (a class's `provides?` callback replaces
    /// its filters), then classes whose callback claims the name without a
    /// registration, then the legacy naming convention.
    pub fn resolve(
        &self,
        dsl_name: &str,
        node: &Node,
        legacy: Option<&dyn LegacyNamespace>,
        bus: &WarningBus,
    ) -> Result<Option<ResourceClass>> {
        match self.lookup(dsl_name) {
            Some(lookup) => lookup.resolve(node, legacy, bus),
            None => Ok(None),
        }
    }

    /// Copy out everything resolving `dsl_name` reads
    fn lookup(&self, dsl_name: &str) -> Option<ResourceLookup> {
        let name = DslName::new(dsl_name).ok()?;
        let registered: Vec<Entry<ResourceClass>> =
            self.map.candidates(dsl_name).into_iter().cloned().collect();
        let mut callback_only: Vec<ResourceClass> = self
            .classes
            .values()
            .map(|(class, _)| class)
            .filter(|class| {
                class.provides_callback().is_some() && !self.map.is_registered(dsl_name, class.id())
            })
            .cloned()
            .collect();
        callback_only.sort_by(|a, b| a.name().cmp(b.name()));
        let named = self
            .classes
            .iter()
            .filter(|(_, (_, state))| state.primary != PrimaryName::Unset)
            .map(|(id, _)| *id)
            .collect();
        Some(ResourceLookup {
            name,
            registered,
            callback_only,
            named,
        })
    }

    /// The class a bare DSL name refers to, ignoring filtered registrations
    ///
    /// Meant for help output: no node, no callbacks, no legacy lookup and no
    /// warnings.
    pub fn resource_matching_short_name(&self, dsl_name: &str) -> Option<ResourceClass> {
        self.map
            .candidates(dsl_name)
            .into_iter()
            .find(|entry| entry.filter.is_empty())
            .map(|entry| entry.class.clone())
    }

    /// Mark a DSL name as deprecated
    pub fn deprecate(&mut self, dsl_name: &str, replacement: Option<&str>) -> Result<()> {
        let name = DslName::new(dsl_name)?;
        self.deprecated
            .insert(name, replacement.map(str::to_string));
        Ok(())
    }

    /// `Some(replacement)` if the name is deprecated
    pub fn deprecation(&self, dsl_name: &str) -> Option<Option<&str>> {
        self.deprecated.get(dsl_name).map(Option::as_deref)
    }

    pub fn candidates(&self, dsl_name: &str) -> Vec<&Entry<ResourceClass>> {
        self.map.candidates(dsl_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &DslName> {
        self.map.names()
    }

    /// Forget every registration under `dsl_name`
    pub fn remove_all(&mut self, dsl_name: &str) {
        self.map.remove_all(dsl_name);
        for (_, state) in self.classes.values_mut() {
            state.provided.remove(dsl_name);
            if state.auto.as_ref().is_some_and(|n| n.as_str() == dsl_name) {
                state.auto = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.classes.clear();
        self.deprecated.clear();
    }
}

/// Provider classes by DSL name
#[derive(Default)]
pub struct ProviderRegistry {
    map: PriorityMap<ProviderClass>,
    classes: BTreeMap<ClassId, ProviderClass>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a class known so its `provides?` callback takes part in resolution
    pub fn declare(&mut self, class: &ProviderClass) {
        self.classes
            .entry(class.id())
            .or_insert_with(|| class.clone());
    }

    pub fn register(
        &mut self,
        class: &ProviderClass,
        dsl_name: &str,
        filter: Filter,
        flags: Flags,
        bus: &WarningBus,
    ) -> Result<Option<Warning>> {
        let name = DslName::new(dsl_name)?;
        let warning = shadow_warning(&self.map, "provider", &name, class, &filter, flags, bus)?;

        self.declare(class);
        log::debug!(
            "Registering provider {} for {name} {filter}{}",
            class.name(),
            if flags.overrides { " (override)" } else { "" }
        );
        self.map.insert(name, class.clone(), filter, flags);
        Ok(warning)
    }

    /// Pick the provider for running `action` on `resource`
    ///
    /// A provider pinned on the resource class wins outright. Otherwise
    /// eligible candidates under the resource's declared type are collected in
    /// priority order (callback-only classes last, alphabetically), and the
    /// first one whose `supports?` accepts the action wins. If none does, the
    /// first eligible candidate is used anyway.
    pub fn resolve_for(
        &self,
        resource: &Resource,
        action: &Action,
        node: &Node,
        legacy: Option<&dyn LegacyNamespace>,
        bus: &WarningBus,
    ) -> Result<ProviderClass> {
        self.lookup(resource.declared_type().as_str())
            .resolve(resource, action, node, legacy, bus)
    }

    /// Copy out everything resolving a provider for `declared` reads
    fn lookup(&self, declared: &str) -> ProviderLookup {
        let registered: Vec<Entry<ProviderClass>> =
            self.map.candidates(declared).into_iter().cloned().collect();
        let mut callback_only: Vec<ProviderClass> = self
            .classes
            .values()
            .filter(|class| {
                class.provides_callback().is_some() && !self.map.is_registered(declared, class.id())
            })
            .cloned()
            .collect();
        callback_only.sort_by(|a, b| a.name().cmp(b.name()));
        ProviderLookup {
            registered,
            callback_only,
        }
    }

    pub fn candidates(&self, dsl_name: &str) -> Vec<&Entry<ProviderClass>> {
        self.map.candidates(dsl_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &DslName> {
        self.map.names()
    }

    pub fn remove_all(&mut self, dsl_name: &str) {
        self.map.remove_all(dsl_name);
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.classes.clear();
    }
}

/// A snapshot of one DSL name's resource candidates
///
/// Resolution runs `provides?` callbacks and warning sinks, so it works on a
/// copy taken under the lock and evaluates with the lock released.
struct ResourceLookup {
    name: DslName,
    registered: Vec<Entry<ResourceClass>>,
    /// Callback classes not registered under the name, by class name
    callback_only: Vec<ResourceClass>,
    /// Classes that declared a primary name or cleared it
    named: BTreeSet<ClassId>,
}

impl ResourceLookup {
    fn resolve(
        self,
        node: &Node,
        legacy: Option<&dyn LegacyNamespace>,
        bus: &WarningBus,
    ) -> Result<Option<ResourceClass>> {
        let name = &self.name;
        for entry in self.registered {
            let eligible = match entry.class.provides_callback() {
                Some(callback) => callback(node, name),
                None => entry.filter.matches(node),
            };
            log::trace!(
                "{name}: {} {} eligible={eligible}",
                entry.class.name(),
                entry.filter
            );
            if eligible {
                return Ok(Some(entry.class));
            }
        }

        if let Some(class) = self
            .callback_only
            .into_iter()
            .find(|class| class.provides_callback().is_some_and(|cb| cb(node, name)))
        {
            bus.warn(Warning::provides_without_register(class.name(), name.as_str()))?;
            return Ok(Some(class));
        }

        if let Some(namespace) = legacy {
            let class_name = class_name_for(name.as_str());
            if let Some(class) = namespace.lookup(&class_name) {
                if !self.named.contains(&class.id()) {
                    bus.warn(Warning::legacy_lookup(
                        class.name(),
                        "resource_name",
                        name.as_str(),
                    ))?;
                    return Ok(Some(class));
                }
                log::debug!(
                    "{} declares its own resource name, not using it for {name}",
                    class.name()
                );
            }
        }

        Ok(None)
    }
}

/// A snapshot of the provider candidates for one declared type
struct ProviderLookup {
    registered: Vec<Entry<ProviderClass>>,
    /// Callback classes not registered under the type, by class name
    callback_only: Vec<ProviderClass>,
}

impl ProviderLookup {
    fn is_registered(&self, class: &ProviderClass) -> bool {
        self.registered.iter().any(|entry| entry.class.id() == class.id())
    }

    fn resolve(
        self,
        resource: &Resource,
        action: &Action,
        node: &Node,
        legacy: Option<&dyn LegacyNamespace>,
        bus: &WarningBus,
    ) -> Result<ProviderClass> {
        if let Some(pinned) = resource.class().pinned_provider() {
            log::debug!("{resource} pins provider {}", pinned.name());
            return Ok(pinned.clone());
        }

        let declared = resource.declared_type().as_str();
        let mut eligible: Vec<&ProviderClass> = Vec::new();
        for entry in &self.registered {
            let ok = match entry.class.provides_callback() {
                Some(callback) => callback(node, resource),
                None => entry.filter.matches(node),
            };
            log::trace!(
                "{resource}: provider {} {} eligible={ok}",
                entry.class.name(),
                entry.filter
            );
            if ok && !eligible.contains(&&entry.class) {
                eligible.push(&entry.class);
            }
        }
        eligible.extend(
            self.callback_only
                .iter()
                .filter(|class| class.provides_callback().is_some_and(|cb| cb(node, resource))),
        );

        let chosen = eligible
            .iter()
            .find(|class| class.supports(resource, action))
            .or_else(|| eligible.first());
        if let Some(class) = chosen {
            if !self.is_registered(class) {
                bus.warn(Warning::provides_without_register(class.name(), declared))?;
            }
            log::debug!("{resource} action {action} uses provider {}", class.name());
            return Ok((*class).clone());
        }

        if let Some(namespace) = legacy {
            let names = [
                class_name_for(declared),
                resource.class().short_name().to_string(),
            ];
            for class_name in names {
                if let Some(class) = namespace.lookup_provider(&class_name) {
                    bus.warn(Warning::legacy_lookup(class.name(), "provides", declared))?;
                    return Ok(class);
                }
            }
        }

        Err(Error::ProviderNotFound {
            declared_type: declared.to_string(),
            action: action.to_string(),
        })
    }
}

#[derive(Default)]
struct Registries {
    resources: ResourceRegistry,
    providers: ProviderRegistry,
    legacy: Option<Arc<dyn LegacyNamespace>>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Both registries and the legacy namespace behind one readers-writer lock,
/// plus the warning bus
pub struct Registry {
    state: RwLock<Registries>,
    bus: WarningBus,
}

impl Registry {
    /// Empty registry warning through the log
    pub fn new() -> Self {
        Self::with_bus(WarningBus::new())
    }

    pub fn with_bus(bus: WarningBus) -> Self {
        Self {
            state: RwLock::new(Registries::default()),
            bus,
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    pub fn warnings(&self) -> &WarningBus {
        &self.bus
    }

    /// Apply the configuration keys the core reads
    pub fn apply_config(&self, config: &Config) {
        self.bus
            .set_treat_as_errors(config.treat_deprecation_warnings_as_errors);
    }

    /// Install the namespace used for convention-based lookups
    pub fn set_legacy_namespace(&self, namespace: Arc<dyn LegacyNamespace>) {
        self.write().legacy = Some(namespace);
    }

    fn read(&self) -> RwLockReadGuard<'_, Registries> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registries> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand warnings produced under the write lock to the sinks
    fn deliver(&self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.bus.emit(&warning);
        }
    }

    /// Define a resource class: replay its `resource_name` and `provides`
    /// statements in order
    pub fn declare_resource(
        &self,
        class: &ResourceClass,
        declaration: &ResourceDeclaration,
    ) -> Result<()> {
        let mut pending = Vec::new();
        {
            let mut state = self.write();
            state.resources.declare(class);
            for step in &declaration.steps {
                let warning = match step {
                    DeclarationStep::ResourceName(name) => {
                        state
                            .resources
                            .set_primary_name(class, name.as_deref(), &self.bus)?
                    }
                    DeclarationStep::Provides(p) => state.resources.register(
                        class,
                        &p.name,
                        p.filter.clone(),
                        p.flags,
                        &self.bus,
                    )?,
                };
                pending.extend(warning);
            }
        }
        self.deliver(pending);
        Ok(())
    }

    /// Define a provider class
    pub fn declare_provider(
        &self,
        class: &ProviderClass,
        declaration: &ProviderDeclaration,
    ) -> Result<()> {
        let mut pending = Vec::new();
        {
            let mut state = self.write();
            state.providers.declare(class);
            for p in &declaration.provides {
                pending.extend(state.providers.register(
                    class,
                    &p.name,
                    p.filter.clone(),
                    p.flags,
                    &self.bus,
                )?);
            }
        }
        self.deliver(pending);
        Ok(())
    }

    pub fn register_resource(
        &self,
        class: &ResourceClass,
        dsl_name: &str,
        filter: Filter,
        flags: Flags,
    ) -> Result<()> {
        let warning = self
            .write()
            .resources
            .register(class, dsl_name, filter, flags, &self.bus)?;
        self.deliver(warning);
        Ok(())
    }

    pub fn set_primary_name(&self, class: &ResourceClass, dsl_name: Option<&str>) -> Result<()> {
        let warning = self
            .write()
            .resources
            .set_primary_name(class, dsl_name, &self.bus)?;
        self.deliver(warning);
        Ok(())
    }

    pub fn primary_name(&self, class: &ResourceClass) -> Option<DslName> {
        self.read().resources.primary_name(class).cloned()
    }

    pub fn register_provider(
        &self,
        class: &ProviderClass,
        dsl_name: &str,
        filter: Filter,
        flags: Flags,
    ) -> Result<()> {
        let warning = self
            .write()
            .providers
            .register(class, dsl_name, filter, flags, &self.bus)?;
        self.deliver(warning);
        Ok(())
    }

    pub fn resolve_resource(&self, dsl_name: &str, node: &Node) -> Result<Option<ResourceClass>> {
        let (lookup, legacy) = {
            let state = self.read();
            (state.resources.lookup(dsl_name), state.legacy.clone())
        };
        match lookup {
            Some(lookup) => lookup.resolve(node, legacy.as_deref(), &self.bus),
            None => Ok(None),
        }
    }

    pub fn resource_matching_short_name(&self, dsl_name: &str) -> Option<ResourceClass> {
        self.read().resources.resource_matching_short_name(dsl_name)
    }

    pub fn resolve_provider(
        &self,
        resource: &Resource,
        action: &Action,
        node: &Node,
    ) -> Result<ProviderClass> {
        let (lookup, legacy) = {
            let state = self.read();
            (
                state.providers.lookup(resource.declared_type().as_str()),
                state.legacy.clone(),
            )
        };
        lookup.resolve(resource, action, node, legacy.as_deref(), &self.bus)
    }

    pub fn deprecate(&self, dsl_name: &str, replacement: Option<&str>) -> Result<()> {
        self.write().resources.deprecate(dsl_name, replacement)
    }

    pub fn deprecation(&self, dsl_name: &str) -> Option<Option<String>> {
        self.read()
            .resources
            .deprecation(dsl_name)
            .map(|r| r.map(str::to_string))
    }

    pub fn resource_names(&self) -> Vec<DslName> {
        self.read().resources.names().cloned().collect()
    }

    pub fn provider_names(&self) -> Vec<DslName> {
        self.read().providers.names().cloned().collect()
    }

    /// Resource registrations under a name, in priority order
    pub fn resource_candidates(&self, dsl_name: &str) -> Vec<Candidate> {
        self.read()
            .resources
            .candidates(dsl_name)
            .into_iter()
            .map(|e| Candidate {
                class_name: e.class.name().to_string(),
                filter: e.filter.clone(),
                flags: e.flags,
                has_callback: e.class.provides_callback().is_some(),
            })
            .collect()
    }

    /// Provider registrations under a name, in priority order
    pub fn provider_candidates(&self, dsl_name: &str) -> Vec<Candidate> {
        self.read()
            .providers
            .candidates(dsl_name)
            .into_iter()
            .map(|e| Candidate {
                class_name: e.class.name().to_string(),
                filter: e.filter.clone(),
                flags: e.flags,
                has_callback: e.class.provides_callback().is_some(),
            })
            .collect()
    }

    /// Forget every registration under a name in both registries
    pub fn remove_all(&self, dsl_name: &str) {
        let mut state = self.write();
        state.resources.remove_all(dsl_name);
        state.providers.remove_all(dsl_name);
    }

    /// Clear both registries and the legacy namespace
    pub fn reset(&self) {
        let mut state = self.write();
        state.resources.clear();
        state.providers.clear();
        state.legacy = None;
        log::debug!("Registry reset");
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
