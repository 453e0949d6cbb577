//! Recipe-time dispatch and action execution
//!
//! [`Dsl::dispatch`] is what a recipe line such as
//!
//! ```text
//! package "git" do
//!   version "2.43.0"
//! end
//! ```
//!
//! turns into: resolve `package` for the current node, instantiate the class
//! with `"git"` as its name, run the block against a [`ResourceBuilder`] and
//! append the result to the run's resource collection. Later,
//! [`Dsl::execute`] resolves a provider for one action and runs it, and
//! [`Dsl::converge`] does that for the whole collection.

use serde_json::Value;

use crate::context::{ActionContext, RunContext};
use crate::error::{Error, Result};
use crate::node::display_value;
use crate::registry::Registry;
use crate::resource::{Block, Resource, ResourceBuilder};
use crate::types::{Action, ApplyResult, ConvergeSummary, DslName};
use crate::warnings::Warning;

/// Dispatcher bound to a registry
#[derive(Clone, Copy)]
pub struct Dsl<'r> {
    registry: &'r Registry,
}

impl Dsl<'static> {
    /// Dispatcher over the process-wide registry
    pub fn global() -> Self {
        Self::new(Registry::global())
    }
}

impl<'r> Dsl<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Summon a resource from a recipe
    ///
    /// `args[0]` is the resource name. The block runs without any registry
    /// lock held; if it fails, nothing is added to the collection.
    pub fn dispatch<'c, F>(
        &self,
        run_context: &'c mut RunContext,
        dsl_name: &str,
        args: &[Value],
        block: F,
    ) -> Result<&'c mut Resource>
    where
        F: FnOnce(&mut ResourceBuilder<'_>) -> Result<()>,
    {
        if let Some(replacement) = self.registry.deprecation(dsl_name) {
            self.registry
                .warnings()
                .warn(Warning::deprecated_dsl(dsl_name, replacement.as_deref()))?;
        }

        let resolved = match DslName::new(dsl_name) {
            Ok(declared_type) => self
                .registry
                .resolve_resource(dsl_name, &run_context.node)?
                .map(|class| (declared_type, class)),
            Err(_) => None,
        };
        let Some((declared_type, class)) = resolved else {
            return Err(Error::NoSuchResourceType {
                dsl_name: dsl_name.to_string(),
                node: run_context.node.summary(),
            });
        };

        let name = args
            .first()
            .filter(|v| !v.is_null())
            .map(display_value)
            .ok_or_else(|| Error::MissingResourceName {
                dsl_name: dsl_name.to_string(),
            })?;

        let mut resource = Resource::new(class, name, declared_type);
        block(&mut resource.builder())?;
        resource.mark_compiled();
        log::debug!("Compiled {resource} as {}", resource.class().name());

        Ok(run_context.resource_collection.append(resource))
    }

    /// [`dispatch`](Self::dispatch) with a block given as data
    pub fn dispatch_block<'c>(
        &self,
        run_context: &'c mut RunContext,
        dsl_name: &str,
        args: &[Value],
        block: &Block,
    ) -> Result<&'c mut Resource> {
        self.dispatch(run_context, dsl_name, args, |builder| block.apply(builder))
    }

    /// Run one action on a compiled resource
    ///
    /// The resource moves through `converging` to `updated` or `unchanged`;
    /// any error leaves it `failed`.
    pub fn execute(
        &self,
        resource: &mut Resource,
        action: &Action,
        ctx: &ActionContext<'_>,
    ) -> Result<ApplyResult> {
        resource.begin_converge()?;
        match self.run_action(resource, action, ctx) {
            Ok(result) => {
                resource.finish_converge(result.is_change());
                Ok(result)
            }
            Err(e) => {
                resource.mark_failed();
                Err(e)
            }
        }
    }

    /// Run every action the recipe requested for one resource, in order
    pub fn converge_resource(
        &self,
        resource: &mut Resource,
        ctx: &ActionContext<'_>,
    ) -> Result<Vec<ApplyResult>> {
        resource.begin_converge()?;
        let actions = resource.requested_actions().to_vec();
        let mut results = Vec::with_capacity(actions.len());
        for action in &actions {
            match self.run_action(resource, action, ctx) {
                Ok(result) => results.push(result),
                Err(e) => {
                    resource.mark_failed();
                    return Err(e);
                }
            }
        }
        resource.finish_converge(results.iter().any(ApplyResult::is_change));
        Ok(results)
    }

    /// Converge the whole resource collection in declaration order
    ///
    /// Stops at the first failing resource.
    pub fn converge(&self, run_context: &mut RunContext) -> Result<ConvergeSummary> {
        let (collection, ctx) = run_context.parts_mut();
        let mut summary = ConvergeSummary::default();
        for resource in collection.iter_mut() {
            let results = self.converge_resource(resource, &ctx)?;
            summary.add_resource(&results);
        }
        log::info!(
            "Converged {} resources: {} updated, {} unchanged, {} skipped",
            summary.total(),
            summary.updated,
            summary.unchanged,
            summary.skipped
        );
        Ok(summary)
    }

    fn run_action(
        &self,
        resource: &mut Resource,
        action: &Action,
        ctx: &ActionContext<'_>,
    ) -> Result<ApplyResult> {
        resource.check_action(action)?;
        let provider_class = self
            .registry
            .resolve_provider(resource, action, ctx.node())?;
        let mut provider = provider_class.instantiate();

        provider.load_current_resource(resource, ctx)?;
        let result = if action.is_nothing() {
            ApplyResult::NoChange
        } else {
            provider.run_action(action, resource, ctx)?
        };
        resource.set_updated_by_last_action(result.is_change());
        log::debug!(
            "{resource} action {action} via {}: {result:?}",
            provider_class.name()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::node::Node;
    use crate::provider::{Provider, ProviderClass};
    use crate::registry::{ProviderDeclaration, Provides, ResourceDeclaration};
    use crate::resource::ResourceClass;
    use crate::types::ResourceState;
    use crate::warnings::{RecordingSink, WarningBus, WarningKind};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Calls(Arc<Mutex<Vec<String>>>);

    impl Calls {
        fn push(&self, call: String) {
            self.0.lock().unwrap().push(call);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    struct Recorder {
        label: &'static str,
        calls: Calls,
        result: ApplyResult,
    }

    impl Provider for Recorder {
        fn load_current_resource(&mut self, resource: &Resource, _ctx: &ActionContext<'_>) -> Result<()> {
            self.calls
                .push(format!("{}:load:{}", self.label, resource.name()));
            Ok(())
        }

        fn run_action(
            &mut self,
            action: &Action,
            resource: &Resource,
            ctx: &ActionContext<'_>,
        ) -> Result<ApplyResult> {
            self.calls
                .push(format!("{}:{action}:{}", self.label, resource.name()));
            if ctx.why_run() {
                return Ok(ApplyResult::Skipped {
                    reason: "why-run".to_string(),
                });
            }
            Ok(self.result.clone())
        }
    }

    struct Mismatch;

    impl Provider for Mismatch {
        fn run_action(
            &mut self,
            _action: &Action,
            resource: &Resource,
            _ctx: &ActionContext<'_>,
        ) -> Result<ApplyResult> {
            Err(Error::FileTypeMismatch {
                path: resource.name().into(),
                expected: "file".to_string(),
                actual: "directory".to_string(),
            })
        }
    }

    struct Fixture {
        registry: Registry,
        sink: Arc<RecordingSink>,
        calls: Calls,
    }

    fn recorder(name: &str, label: &'static str, calls: &Calls, result: ApplyResult) -> ProviderClass {
        let calls = calls.clone();
        ProviderClass::builder(name, move || {
            Box::new(Recorder {
                label,
                calls: calls.clone(),
                result: result.clone(),
            })
        })
        .build()
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let registry = Registry::with_bus(WarningBus::with_sinks(vec![sink.clone()]));
        let calls = Calls::default();

        let file = ResourceClass::builder("Sous::Resource::File")
            .actions(["create", "delete"])
            .attribute("content")
            .attribute_default("mode", "0644")
            .build()
            .unwrap();
        registry
            .declare_resource(
                &file,
                &ResourceDeclaration::new()
                    .resource_name("file")
                    .provides(Provides::new("cookbook_file")),
            )
            .unwrap();

        let file_provider = recorder("Sous::Provider::File", "file", &calls, ApplyResult::Modified);
        registry
            .declare_provider(&file_provider, &ProviderDeclaration::new().provides(Provides::new("file")))
            .unwrap();
        let cookbook_provider = recorder(
            "Sous::Provider::CookbookFile",
            "cookbook_file",
            &calls,
            ApplyResult::Created,
        );
        registry
            .declare_provider(
                &cookbook_provider,
                &ProviderDeclaration::new().provides(Provides::new("cookbook_file")),
            )
            .unwrap();

        Fixture {
            registry,
            sink,
            calls,
        }
    }

    fn action(name: &str) -> Action {
        Action::new(name).unwrap()
    }

    #[test]
    fn test_dispatch_compiles_and_records() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new().with("os", "linux"));

        let resource = dsl
            .dispatch(&mut ctx, "file", &[json!("/etc/motd")], |r| {
                r.set("content", "hello")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(resource.name(), "/etc/motd");
        assert_eq!(resource.declared_type().as_str(), "file");
        assert_eq!(resource.state(), ResourceState::Compiled);
        assert_eq!(resource.attribute_str("content"), Some("hello"));
        assert_eq!(resource.attribute_str("mode"), Some("0644"));
        assert!(resource.allowed_actions().contains(&Action::nothing()));
        assert_eq!(ctx.resource_collection.len(), 1);
        assert!(ctx.resource_collection.find("file", "/etc/motd").is_some());
    }

    #[test]
    fn test_dispatch_unknown_name() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new().with("os", "linux").with("platform", "x"));

        let err = dsl
            .dispatch(&mut ctx, "my_super_thingy", &[json!("a")], |_| Ok(()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot find a resource for my_super_thingy on os=linux platform=x"
        );

        let err = dsl
            .dispatch(&mut ctx, "Not A Name", &[json!("a")], |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchResourceType { .. }));
        assert!(ctx.resource_collection.is_empty());
    }

    #[test]
    fn test_dispatch_requires_name() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        let err = dsl.dispatch(&mut ctx, "file", &[], |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::MissingResourceName { .. }));
    }

    #[test]
    fn test_failed_block_is_not_recorded() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        let err = dsl
            .dispatch(&mut ctx, "file", &[json!("x")], |r| {
                r.set("colour", "blue")?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute { .. }));
        assert!(ctx.resource_collection.is_empty());
    }

    #[test]
    fn test_dispatch_block_data() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        let block = Block::new().set("content", "hi").action("delete");
        let resource = dsl
            .dispatch_block(&mut ctx, "file", &[json!("/tmp/x")], &block)
            .unwrap();
        assert_eq!(resource.requested_actions(), &[action("delete")]);
    }

    #[test]
    fn test_execute_uses_declared_type() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();
        dsl.dispatch(&mut ctx, "cookbook_file", &[json!("b")], |_| Ok(()))
            .unwrap();

        let (collection, actx) = ctx.parts_mut();
        let create = action("create");
        for resource in collection.iter_mut() {
            dsl.execute(resource, &create, &actx).unwrap();
        }
        assert_eq!(
            f.calls.take(),
            vec![
                "file:load:a",
                "file:create:a",
                "cookbook_file:load:b",
                "cookbook_file:create:b",
            ]
        );
    }

    #[test]
    fn test_execute_updates_state() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();

        let (collection, actx) = ctx.parts_mut();
        let resource = collection.get_mut(0).unwrap();
        let result = dsl.execute(resource, &action("create"), &actx).unwrap();
        assert_eq!(result, ApplyResult::Modified);
        assert!(resource.updated_by_last_action());
        assert_eq!(resource.state(), ResourceState::Updated);

        let err = dsl.execute(resource, &action("create"), &actx).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(resource.state(), ResourceState::Updated);
    }

    #[test]
    fn test_execute_nothing_loads_but_does_not_run() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();

        let (collection, actx) = ctx.parts_mut();
        let resource = collection.get_mut(0).unwrap();
        let result = dsl.execute(resource, &Action::nothing(), &actx).unwrap();
        assert_eq!(result, ApplyResult::NoChange);
        assert!(!resource.updated_by_last_action());
        assert_eq!(resource.state(), ResourceState::Unchanged);
        assert_eq!(f.calls.take(), vec!["file:load:a"]);
    }

    #[test]
    fn test_execute_rejects_undeclared_action() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();

        let (collection, actx) = ctx.parts_mut();
        let resource = collection.get_mut(0).unwrap();
        let err = dsl.execute(resource, &action("explode"), &actx).unwrap_err();
        assert!(matches!(err, Error::InvalidAction { .. }));
        assert_eq!(resource.state(), ResourceState::Failed);
        assert!(f.calls.take().is_empty());
    }

    #[test]
    fn test_provider_errors_propagate_verbatim() {
        let f = fixture();
        let dir = ResourceClass::builder("Sous::Resource::Template")
            .actions(["create"])
            .provider(ProviderClass::builder("Sous::Provider::Mismatch", || Box::new(Mismatch)).build())
            .build()
            .unwrap();
        f.registry
            .declare_resource(&dir, &ResourceDeclaration::new().resource_name("template"))
            .unwrap();

        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "template", &[json!("/etc")], |_| Ok(()))
            .unwrap();
        let err = dsl.converge(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::FileTypeMismatch { .. }));
        assert_eq!(
            ctx.resource_collection.get(0).map(Resource::state),
            Some(ResourceState::Failed)
        );
    }

    #[test]
    fn test_provider_not_found_fails_resource() {
        let f = fixture();
        let orphan = ResourceClass::builder("Sous::Resource::Orphan")
            .actions(["create"])
            .build()
            .unwrap();
        f.registry
            .declare_resource(&orphan, &ResourceDeclaration::new().resource_name("orphan"))
            .unwrap();

        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "orphan", &[json!("o")], |_| Ok(()))
            .unwrap();
        let err = dsl.converge(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound { .. }));
        assert_eq!(
            ctx.resource_collection.get(0).map(Resource::state),
            Some(ResourceState::Failed)
        );
    }

    #[test]
    fn test_converge_summary() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();
        dsl.dispatch(&mut ctx, "file", &[json!("b")], |r| {
            r.action("nothing")?;
            Ok(())
        })
        .unwrap();

        let summary = dsl.converge(&mut ctx).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn test_converge_why_run_skips() {
        let f = fixture();
        let dsl = Dsl::new(&f.registry);
        let config = Config {
            why_run: true,
            ..Config::default()
        };
        let mut ctx = RunContext::new(Node::new()).with_config(config);
        dsl.dispatch(&mut ctx, "file", &[json!("a")], |_| Ok(()))
            .unwrap();

        let summary = dsl.converge(&mut ctx).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            ctx.resource_collection.get(0).map(Resource::state),
            Some(ResourceState::Unchanged)
        );
    }

    #[test]
    fn test_deprecated_dsl_warns() {
        let f = fixture();
        f.registry.deprecate("cookbook_file", Some("file")).unwrap();
        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        dsl.dispatch(&mut ctx, "cookbook_file", &[json!("a")], |_| Ok(()))
            .unwrap();

        let warnings = f.sink.of_kind(WarningKind::DeprecatedDsl);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].get("replacement"), Some("file"));

        f.registry.apply_config(&Config {
            treat_deprecation_warnings_as_errors: true,
            ..Config::default()
        });
        let err = dsl
            .dispatch(&mut ctx, "cookbook_file", &[json!("b")], |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::Deprecation { .. }));
        assert_eq!(ctx.resource_collection.len(), 1);
    }

    #[test]
    fn test_subclass_instances_keep_their_own_actions() {
        let f = fixture();
        let parent = ResourceClass::builder("Sous::Resource::Parent")
            .actions(["create"])
            .build()
            .unwrap();
        let child = ResourceClass::builder("Sous::Resource::Child")
            .extends(&parent)
            .actions(["delete"])
            .build()
            .unwrap();
        f.registry
            .declare_resource(&parent, &ResourceDeclaration::new().resource_name("parent"))
            .unwrap();
        f.registry
            .declare_resource(&child, &ResourceDeclaration::new().resource_name("child"))
            .unwrap();

        let dsl = Dsl::new(&f.registry);
        let mut ctx = RunContext::new(Node::new());
        let names = |r: &Resource| -> Vec<String> {
            r.allowed_actions().iter().map(ToString::to_string).collect()
        };
        let p = dsl.dispatch(&mut ctx, "parent", &[json!("p")], |_| Ok(())).unwrap();
        assert_eq!(names(p), vec!["nothing", "create"]);
        let c = dsl.dispatch(&mut ctx, "child", &[json!("c")], |_| Ok(())).unwrap();
        assert_eq!(names(c), vec!["nothing", "delete"]);
    }
}
