//! # Declarative
//!
//! Resolution core for declarative recipes: which resource class a recipe's
//! DSL name means on this host, and which provider realizes it.
//!
//! ## Core Concepts
//!
//! - **Node**: read-only snapshot of host attributes (`os`, `platform`, ...)
//! - **Filter**: conjunction of attribute constraints gating a registration
//! - **Priority map**: per-name ordered registrations with an override tier and
//!   an alphabetical tie-break
//! - **Registry**: resource and provider registries behind one lock, plus the
//!   warning bus
//! - **Dsl**: recipe-time dispatch and action execution
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     Dsl, Filter, Node, ProviderClass, ProviderDeclaration, Provides, Registry,
//!     ResourceClass, ResourceDeclaration, RunContext,
//! };
//! use serde_json::json;
//!
//! let registry = Registry::new();
//!
//! let package = ResourceClass::builder("Sous::Resource::AptPackage")
//!     .actions(["install", "remove"])
//!     .attribute("version")
//!     .build()?;
//! registry.declare_resource(
//!     &package,
//!     &ResourceDeclaration::new()
//!         .resource_name("apt_package")
//!         .provides(Provides::new("package").filter(Filter::new().platform_family("debian"))),
//! )?;
//!
//! let apt = ProviderClass::builder("Sous::Provider::Apt", || Box::new(AptProvider)).build();
//! registry.declare_provider(&apt, &ProviderDeclaration::new().provides(Provides::new("package")))?;
//!
//! let dsl = Dsl::new(&registry);
//! let mut run = RunContext::new(Node::new().with("platform_family", "debian"));
//! dsl.dispatch(&mut run, "package", &[json!("git")], |r| {
//!     r.set("version", "1:2.43.0")?;
//!     Ok(())
//! })?;
//! let summary = dsl.converge(&mut run)?;
//! ```
//!
//! ## Warnings
//!
//! Shadowed registrations, callback-only matches, convention lookups and
//! deprecated names are reported through [`WarningBus`]. Setting
//! `treat_deprecation_warnings_as_errors` turns each of them into
//! [`Error::Deprecation`].

pub mod config;
pub mod context;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod legacy;
pub mod node;
pub mod priority;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod types;
pub mod version;
pub mod warnings;

// Re-export main types at crate root
pub use config::Config;
pub use context::{ActionContext, ResourceCollection, RunContext};
pub use dsl::Dsl;
pub use error::{Error, ErrorCategory, Result};
pub use filter::{Filter, Matcher};
pub use legacy::{ClassNamespace, LegacyNamespace, class_name_for};
pub use node::Node;
pub use priority::{ClassHandle, ClassId, Flags, PriorityMap};
pub use provider::{Provider, ProviderClass, ProviderClassBuilder};
pub use registry::{
    Candidate, ProviderDeclaration, ProviderRegistry, Provides, Registry, ResourceDeclaration,
    ResourceRegistry,
};
pub use resource::{Block, Resource, ResourceBuilder, ResourceClass, ResourceClassBuilder};
pub use types::{Action, ApplyResult, ConvergeSummary, DslName, ResourceState};
pub use version::{Version, VersionRequirement};
pub use warnings::{LogSink, RecordingSink, Warning, WarningBus, WarningKind, WarningSink};
