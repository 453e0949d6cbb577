//! Run-time context shared by the dispatcher and providers

use crate::config::Config;
use crate::node::Node;
use crate::resource::Resource;

/// Resources collected from a recipe, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ResourceCollection {
    resources: Vec<Resource>,
}

impl ResourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, resource: Resource) -> &mut Resource {
        self.resources.push(resource);
        let last = self.resources.len() - 1;
        &mut self.resources[last]
    }

    pub fn get(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Resource> {
        self.resources.get_mut(index)
    }

    /// Find a resource by its `declared_type[name]` identity
    pub fn find(&self, declared_type: &str, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.declared_type().as_str() == declared_type && r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of one recipe run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub node: Node,
    pub config: Config,
    pub resource_collection: ResourceCollection,
}

impl RunContext {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            config: Config::default(),
            resource_collection: ResourceCollection::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Split into the collection and a read-only context for providers
    pub fn parts_mut(&mut self) -> (&mut ResourceCollection, ActionContext<'_>) {
        (
            &mut self.resource_collection,
            ActionContext::new(&self.node, &self.config),
        )
    }
}

/// What a provider may read while running an action
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    node: &'a Node,
    config: &'a Config,
}

impl<'a> ActionContext<'a> {
    pub fn new(node: &'a Node, config: &'a Config) -> Self {
        Self { node, config }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Check if providers should only report what they would do
    pub fn why_run(&self) -> bool {
        self.config.why_run
    }
}
