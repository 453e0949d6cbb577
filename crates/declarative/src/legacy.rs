//! Class lookup by naming convention
//!
//! Older cookbooks define resource and provider classes without declaring a
//! DSL name and rely on the name being derived from the class name:
//! `backcompat_thingy` finds a class named `BackcompatThingy`. The core does
//! not know where such classes live, so the host supplies a
//! [`LegacyNamespace`].

use heck::ToUpperCamelCase;
use std::collections::BTreeMap;

use crate::provider::ProviderClass;
use crate::resource::ResourceClass;

/// Host-supplied map from class base names to classes
pub trait LegacyNamespace: Send + Sync {
    /// Find a resource class by base name, e.g. `BackcompatThingy`
    fn lookup(&self, class_name: &str) -> Option<ResourceClass>;

    /// Find a provider class by base name
    fn lookup_provider(&self, class_name: &str) -> Option<ProviderClass>;
}

/// Class base name a DSL name maps to: `backcompat_thingy` -> `BackcompatThingy`
pub fn class_name_for(dsl_name: &str) -> String {
    dsl_name.to_upper_camel_case()
}

/// A [`LegacyNamespace`] backed by two maps keyed by class base name
#[derive(Debug, Clone, Default)]
pub struct ClassNamespace {
    resources: BTreeMap<String, ResourceClass>,
    providers: BTreeMap<String, ProviderClass>,
}

impl ClassNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource class under its base name
    pub fn add_resource(&mut self, class: ResourceClass) -> &mut Self {
        self.resources.insert(class.short_name().to_string(), class);
        self
    }

    /// Add a provider class under its base name
    pub fn add_provider(&mut self, class: ProviderClass) -> &mut Self {
        self.providers.insert(class.short_name().to_string(), class);
        self
    }
}

impl LegacyNamespace for ClassNamespace {
    fn lookup(&self, class_name: &str) -> Option<ResourceClass> {
        self.resources.get(class_name).cloned()
    }

    fn lookup_provider(&self, class_name: &str) -> Option<ProviderClass> {
        self.providers.get(class_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_for() {
        assert_eq!(class_name_for("backcompat_thingy"), "BackcompatThingy");
        assert_eq!(class_name_for("apt_package"), "AptPackage");
        assert_eq!(class_name_for("log"), "Log");
    }

    #[test]
    fn test_namespace_keys_by_base_name() {
        let class = ResourceClass::builder("Legacy::Cookbook::BackcompatThingy")
            .build()
            .unwrap();
        let mut namespace = ClassNamespace::new();
        namespace.add_resource(class.clone());

        assert_eq!(namespace.lookup("BackcompatThingy"), Some(class));
        assert!(namespace.lookup("Legacy::Cookbook::BackcompatThingy").is_none());
        assert!(namespace.lookup_provider("BackcompatThingy").is_none());
    }
}
