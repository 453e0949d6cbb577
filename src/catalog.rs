//! Built-in resources and providers
//!
//! `log` writes a message through the logger. `package` resolves per
//! platform family to `apt_package`, `dnf_package` or `brew_package`, each
//! realized by a provider driving the matching package manager.

use anyhow::{Context, anyhow, bail};
use declarative::{
    Action, ActionContext, ApplyResult, Filter, Provider, ProviderClass, ProviderDeclaration,
    Provides, Registry, Resource, ResourceClass, ResourceDeclaration,
};
use std::process::Command;

/// Register every built-in class with `registry`
pub fn install(registry: &Registry) -> declarative::Result<()> {
    install_log(registry)?;
    install_packages(registry)?;
    log::debug!("Installed built-in resources");
    Ok(())
}

// ============================================================================
// log
// ============================================================================

fn install_log(registry: &Registry) -> declarative::Result<()> {
    let resource = ResourceClass::builder("Sous::Resource::Log")
        .actions(["write"])
        .attribute("message")
        .attribute_default("level", "info")
        .build()?;
    registry.declare_resource(&resource, &ResourceDeclaration::new().resource_name("log"))?;

    let provider = ProviderClass::builder("Sous::Provider::Log", || Box::new(LogProvider)).build();
    registry.declare_provider(
        &provider,
        &ProviderDeclaration::new().provides(Provides::new("log")),
    )
}

struct LogProvider;

impl Provider for LogProvider {
    fn run_action(
        &mut self,
        _action: &Action,
        resource: &Resource,
        ctx: &ActionContext<'_>,
    ) -> declarative::Result<ApplyResult> {
        let message = resource
            .attribute_str("message")
            .unwrap_or_else(|| resource.name());
        let raw_level = resource.attribute_str("level").unwrap_or("info");
        let level: log::Level = raw_level
            .parse()
            .map_err(|_| anyhow!("{resource} has an invalid level '{raw_level}'"))?;

        if ctx.why_run() {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would log '{message}'"),
            });
        }
        log::log!(target: "recipe", level, "{message}");
        Ok(ApplyResult::Modified)
    }
}

// ============================================================================
// package
// ============================================================================

/// Package managers the package providers can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Brew,
}

impl PackageManager {
    const ALL: [Self; 3] = [Self::Apt, Self::Dnf, Self::Brew];

    /// DSL name of the resource this manager backs
    pub fn dsl_name(self) -> &'static str {
        match self {
            Self::Apt => "apt_package",
            Self::Dnf => "dnf_package",
            Self::Brew => "brew_package",
        }
    }

    fn class_suffix(self) -> &'static str {
        match self {
            Self::Apt => "AptPackage",
            Self::Dnf => "DnfPackage",
            Self::Brew => "BrewPackage",
        }
    }

    /// Platforms where `package` means this manager
    pub fn filter(self) -> Filter {
        match self {
            Self::Apt => Filter::new().platform_family("debian"),
            Self::Dnf => Filter::new().one_of("platform_family", ["rhel", "fedora", "amazon"]),
            Self::Brew => Filter::new().platform_family("mac_os_x"),
        }
    }

    /// Command that installs `package`, pinned to `version` when given
    pub fn install_command(self, package: &str, version: Option<&str>) -> Vec<String> {
        let target = match (self, version) {
            (_, None) => package.to_string(),
            (Self::Apt, Some(v)) => format!("{package}={v}"),
            (Self::Dnf, Some(v)) => format!("{package}-{v}"),
            (Self::Brew, Some(v)) => format!("{package}@{v}"),
        };
        let mut argv: Vec<String> = match self {
            Self::Apt => vec!["apt-get".into(), "install".into(), "-y".into()],
            Self::Dnf => vec!["dnf".into(), "install".into(), "-y".into()],
            Self::Brew => vec!["brew".into(), "install".into()],
        };
        argv.push(target);
        argv
    }

    /// Command that removes `package`
    pub fn remove_command(self, package: &str) -> Vec<String> {
        let mut argv: Vec<String> = match self {
            Self::Apt => vec!["apt-get".into(), "remove".into(), "-y".into()],
            Self::Dnf => vec!["dnf".into(), "remove".into(), "-y".into()],
            Self::Brew => vec!["brew".into(), "uninstall".into()],
        };
        argv.push(package.to_string());
        argv
    }

    /// Command whose success tells whether `package` is installed
    pub fn query_command(self, package: &str) -> Vec<String> {
        match self {
            Self::Apt => vec![
                "dpkg-query".into(),
                "-W".into(),
                "-f=${Status}".into(),
                package.into(),
            ],
            Self::Dnf => vec!["rpm".into(), "-q".into(), package.into()],
            Self::Brew => vec!["brew".into(), "list".into(), "--versions".into(), package.into()],
        }
    }

    /// Interpret the query command's outcome
    pub fn parse_query(self, success: bool, stdout: &str) -> bool {
        match self {
            Self::Apt => success && stdout.contains("install ok installed"),
            Self::Dnf => success,
            Self::Brew => success && !stdout.trim().is_empty(),
        }
    }

    fn is_installed(self, package: &str) -> anyhow::Result<bool> {
        let argv = self.query_command(package);
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .with_context(|| format!("Failed to run {}", argv[0]))?;
        Ok(self.parse_query(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
        ))
    }
}

fn run(argv: &[String]) -> anyhow::Result<()> {
    log::info!("Running {}", argv.join(" "));
    let output = Command::new(&argv[0])
        .args(&argv[1..])
        .output()
        .with_context(|| format!("Failed to run {}", argv[0]))?;
    if !output.status.success() {
        bail!(
            "{} failed: {}",
            argv.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn install_packages(registry: &Registry) -> declarative::Result<()> {
    let base = ResourceClass::builder("Sous::Resource::Package")
        .actions(["install", "remove"])
        .attribute("version")
        .attribute("package_name")
        .build()?;
    registry.declare_resource(&base, &ResourceDeclaration::new().no_resource_name())?;

    for manager in PackageManager::ALL {
        let resource = ResourceClass::builder(format!("Sous::Resource::{}", manager.class_suffix()))
            .extends(&base)
            .build()?;
        registry.declare_resource(
            &resource,
            &ResourceDeclaration::new()
                .resource_name(manager.dsl_name())
                .provides(Provides::new("package").filter(manager.filter())),
        )?;

        let provider = ProviderClass::builder(
            format!("Sous::Provider::Package::{}", manager.class_suffix()),
            move || Box::new(PackageProvider::new(manager)),
        )
        .build();
        registry.declare_provider(
            &provider,
            &ProviderDeclaration::new()
                .provides(Provides::new(manager.dsl_name()))
                .provides(Provides::new("package").filter(manager.filter())),
        )?;
    }
    Ok(())
}

/// Provider for the package resources
pub struct PackageProvider {
    manager: PackageManager,
    installed: Option<bool>,
}

impl PackageProvider {
    pub fn new(manager: PackageManager) -> Self {
        Self {
            manager,
            installed: None,
        }
    }

    fn package_name(resource: &Resource) -> &str {
        resource
            .attribute_str("package_name")
            .unwrap_or_else(|| resource.name())
    }
}

impl Provider for PackageProvider {
    fn load_current_resource(
        &mut self,
        resource: &Resource,
        _ctx: &ActionContext<'_>,
    ) -> declarative::Result<()> {
        let package = Self::package_name(resource);
        let installed = self.manager.is_installed(package)?;
        log::debug!("{package} installed: {installed}");
        self.installed = Some(installed);
        Ok(())
    }

    fn run_action(
        &mut self,
        action: &Action,
        resource: &Resource,
        ctx: &ActionContext<'_>,
    ) -> declarative::Result<ApplyResult> {
        let package = Self::package_name(resource);
        let installing = action.as_str() == "install";
        if self.installed == Some(installing) {
            return Ok(ApplyResult::NoChange);
        }

        let argv = if installing {
            self.manager
                .install_command(package, resource.attribute_str("version"))
        } else {
            self.manager.remove_command(package)
        };
        if ctx.why_run() {
            return Ok(ApplyResult::Skipped {
                reason: format!("Would run {}", argv.join(" ")),
            });
        }

        run(&argv)?;
        self.installed = Some(installing);
        Ok(if installing {
            ApplyResult::Created
        } else {
            ApplyResult::Removed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Config, Dsl, Node, RecordingSink, RunContext, WarningBus};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> (Registry, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let registry = Registry::with_bus(WarningBus::with_sinks(vec![sink.clone()]));
        install(&registry).unwrap();
        (registry, sink)
    }

    fn resolved(registry: &Registry, dsl_name: &str, family: &str) -> Option<String> {
        let node = Node::new().with("platform_family", family);
        registry
            .resolve_resource(dsl_name, &node)
            .unwrap()
            .map(|c| c.name().to_string())
    }

    #[test]
    fn test_install_is_quiet() {
        let (_registry, sink) = registry();
        assert!(sink.is_empty(), "{:?}", sink.warnings());
    }

    #[test]
    fn test_package_per_platform_family() {
        let (registry, _) = registry();
        assert_eq!(
            resolved(&registry, "package", "debian").as_deref(),
            Some("Sous::Resource::AptPackage")
        );
        assert_eq!(
            resolved(&registry, "package", "amazon").as_deref(),
            Some("Sous::Resource::DnfPackage")
        );
        assert_eq!(
            resolved(&registry, "package", "mac_os_x").as_deref(),
            Some("Sous::Resource::BrewPackage")
        );
        assert_eq!(resolved(&registry, "package", "gentoo"), None);
        assert_eq!(
            resolved(&registry, "brew_package", "debian").as_deref(),
            Some("Sous::Resource::BrewPackage")
        );
    }

    #[test]
    fn test_package_provider_follows_platform() {
        let (registry, _) = registry();
        let node = Node::new().with("platform_family", "fedora");
        let class = registry.resolve_resource("package", &node).unwrap().unwrap();
        let resource = Resource::new(
            class,
            "git",
            declarative::DslName::new("package").unwrap(),
        );
        let provider = registry
            .resolve_provider(&resource, &Action::new("install").unwrap(), &node)
            .unwrap();
        assert_eq!(provider.name(), "Sous::Provider::Package::DnfPackage");
    }

    #[test]
    fn test_package_inherits_base_attributes() {
        let (registry, _) = registry();
        let class = registry
            .resolve_resource("apt_package", &Node::new())
            .unwrap()
            .unwrap();
        assert!(class.has_attribute("version"));
        assert!(class.has_attribute("package_name"));
        assert_eq!(class.default_action().as_str(), "install");
    }

    #[test]
    fn test_install_commands() {
        assert_eq!(
            PackageManager::Apt.install_command("git", Some("1:2.43.0")),
            ["apt-get", "install", "-y", "git=1:2.43.0"]
        );
        assert_eq!(
            PackageManager::Dnf.install_command("git", None),
            ["dnf", "install", "-y", "git"]
        );
        assert_eq!(
            PackageManager::Brew.install_command("node", Some("20")),
            ["brew", "install", "node@20"]
        );
        assert_eq!(
            PackageManager::Brew.remove_command("node"),
            ["brew", "uninstall", "node"]
        );
    }

    #[test]
    fn test_parse_query() {
        assert!(PackageManager::Apt.parse_query(true, "install ok installed"));
        assert!(!PackageManager::Apt.parse_query(true, "deinstall ok config-files"));
        assert!(!PackageManager::Dnf.parse_query(false, "package git is not installed"));
        assert!(PackageManager::Brew.parse_query(true, "git 2.45.0\n"));
        assert!(!PackageManager::Brew.parse_query(true, ""));
    }

    #[test]
    fn test_package_provider_skips_when_in_desired_state() {
        let (registry, _) = registry();
        let dsl = Dsl::new(&registry);
        let mut run = RunContext::new(Node::new().with("platform_family", "debian"));
        dsl.dispatch(&mut run, "package", &[json!("git")], |_| Ok(()))
            .unwrap();

        let resource = run.resource_collection.get(0).unwrap();
        let ctx_config = Config::default();
        let ctx = ActionContext::new(&run.node, &ctx_config);
        let mut provider = PackageProvider::new(PackageManager::Apt);
        provider.installed = Some(true);
        let result = provider
            .run_action(&Action::new("install").unwrap(), resource, &ctx)
            .unwrap();
        assert_eq!(result, ApplyResult::NoChange);

        let why_run = Config {
            why_run: true,
            ..Config::default()
        };
        let ctx = ActionContext::new(&run.node, &why_run);
        let result = provider
            .run_action(&Action::new("remove").unwrap(), resource, &ctx)
            .unwrap();
        assert!(matches!(result, ApplyResult::Skipped { .. }));
    }

    #[test]
    fn test_log_converges() {
        let (registry, _) = registry();
        let dsl = Dsl::new(&registry);
        let mut run = RunContext::new(Node::new());
        dsl.dispatch(&mut run, "log", &[json!("hello")], |r| {
            r.set("message", "hello from a recipe")?;
            Ok(())
        })
        .unwrap();

        let summary = dsl.converge(&mut run).unwrap();
        assert_eq!(summary.updated, 1);
        assert!(run.resource_collection.get(0).unwrap().updated_by_last_action());
    }

    #[test]
    fn test_log_why_run_and_bad_level() {
        let (registry, _) = registry();
        let dsl = Dsl::new(&registry);
        let config = Config {
            why_run: true,
            ..Config::default()
        };
        let mut run = RunContext::new(Node::new()).with_config(config);
        dsl.dispatch(&mut run, "log", &[json!("quiet")], |_| Ok(()))
            .unwrap();
        assert_eq!(dsl.converge(&mut run).unwrap().skipped, 1);

        let mut run = RunContext::new(Node::new());
        dsl.dispatch(&mut run, "log", &[json!("loud")], |r| {
            r.set("level", "shouting")?;
            Ok(())
        })
        .unwrap();
        assert!(dsl.converge(&mut run).is_err());
    }
}
