//! plugin facing registry
//!
//! The [Registry] holds everything that is not configuration data itself:
//! - globally registered massagers ([MassagerSet])
//! - macro cleaners per section group
//! - name -> constructor tables for massagers and hooks, used to resolve the dotted names found in
//!   `massagers` declarations and `hooks` values
//!
//! Plugins fill it through the [Plugin] trait when a [crate::Store] is created.
use crate::error::{Error, Result};
use crate::hooks::Hook;
use crate::massager::{Massager, MassagerKind, MassagerSet};
use crate::section::Section;
use indexmap::IndexMap;
use std::sync::Arc;

/// Constructor for a massager implementation, bound to `(group, key)` by the registry
pub type MassagerFactory = Arc<dyn Fn() -> MassagerKind + Send + Sync>;

/// Constructor for a hook
pub type HookFactory = Arc<dyn Fn() -> Arc<dyn Hook> + Send + Sync>;

/// Strips keys from a copy of a macro section before it gets merged into a section of this group
pub type MacroCleaner = Arc<dyn Fn(&mut Section) + Send + Sync>;

/// Capabilities a plugin may provide
///
/// Every method has an empty default, implement the ones you need.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Massager implementations that can be referenced by name
    fn massager_types(&self) -> Vec<(String, MassagerFactory)> {
        Vec::new()
    }

    /// Hook implementations that can be referenced by name
    fn hook_types(&self) -> Vec<(String, HookFactory)> {
        Vec::new()
    }

    /// Massagers to register globally
    fn massagers(&self) -> Vec<Massager> {
        Vec::new()
    }

    /// Macro cleaners, keyed by section group
    fn macro_cleaners(&self) -> Vec<(String, MacroCleaner)> {
        Vec::new()
    }
}

pub struct Registry {
    massagers: MassagerSet,
    macro_cleaners: IndexMap<String, MacroCleaner>,
    massager_types: IndexMap<String, MassagerFactory>,
    hook_types: IndexMap<String, HookFactory>,
}

impl Default for Registry {
    /// Registry that knows the built-in massagers
    fn default() -> Self {
        let mut registry = Self {
            massagers: Default::default(),
            macro_cleaners: Default::default(),
            massager_types: Default::default(),
            hook_types: Default::default(),
        };

        for kind in MassagerKind::builtins() {
            let name = kind.name().to_string();
            registry.register_massager_type(name, Arc::new(move || kind.clone()));
        }

        registry
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("massagers", &self.massagers)
            .field("macro_cleaners", &self.macro_cleaners.keys())
            .field("massager_types", &self.massager_types.keys())
            .field("hook_types", &self.hook_types.keys())
            .finish()
    }
}

impl Registry {
    pub fn new<'p>(plugins: impl IntoIterator<Item = &'p dyn Plugin>) -> Result<Self> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.add_plugin(plugin)?;
        }

        Ok(registry)
    }

    pub fn add_plugin(&mut self, plugin: &dyn Plugin) -> Result<()> {
        tracing::debug!(plugin = plugin.name(), "adding plugin");

        for (name, factory) in plugin.massager_types() {
            self.register_massager_type(name, factory);
        }

        for (name, factory) in plugin.hook_types() {
            self.register_hook_type(name, factory);
        }

        for massager in plugin.massagers() {
            self.add_massager(massager)?;
        }

        for (group, cleaner) in plugin.macro_cleaners() {
            self.add_macro_cleaner(group, cleaner);
        }

        Ok(())
    }

    pub fn massagers(&self) -> &MassagerSet {
        &self.massagers
    }

    /// Register a global massager
    ///
    /// Fails when a different massager is already registered for the same `(group, key)`.
    pub fn add_massager(&mut self, massager: Massager) -> Result<()> {
        self.massagers.add(massager)
    }

    pub fn register_massager_type(&mut self, name: impl Into<String>, factory: MassagerFactory) {
        self.massager_types.insert(name.into(), factory);
    }

    pub fn register_hook_type(&mut self, name: impl Into<String>, factory: HookFactory) {
        self.hook_types.insert(name.into(), factory);
    }

    pub fn add_macro_cleaner(&mut self, group: impl Into<String>, cleaner: MacroCleaner) {
        self.macro_cleaners.insert(group.into(), cleaner);
    }

    pub fn macro_cleaner(&self, group: &str) -> Option<&MacroCleaner> {
        self.macro_cleaners.get(group)
    }

    /// Build the massager registered as `name` for `(group, key)`
    pub fn create_massager(&self, name: &str, group: &str, key: &str) -> Result<Massager> {
        let factory = self
            .massager_types
            .get(name)
            .ok_or_else(|| Error::MassagerResolution {
                name: name.to_string(),
                cause: unknown_name(self.massager_types.keys()),
            })?;

        Ok(Massager::new(group, key, factory()))
    }

    /// Instantiate the hook registered as `name`
    pub fn create_hook(&self, name: &str) -> Result<Arc<dyn Hook>> {
        let factory = self
            .hook_types
            .get(name)
            .ok_or_else(|| Error::HookResolution {
                name: name.to_string(),
                cause: unknown_name(self.hook_types.keys()),
            })?;

        Ok(factory())
    }
}

fn unknown_name<'a>(known: impl Iterator<Item = &'a String>) -> String {
    let known: Vec<&str> = known.map(String::as_str).collect();
    if known.is_empty() {
        return "nothing is registered under this name".to_string();
    }

    format!(
        "nothing is registered under this name (known: {})",
        known.join(", ")
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::section::ConfigValue;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Notify;

    impl Hook for Notify {
        fn name(&self) -> &str {
            "example.Notify"
        }
    }

    struct ExamplePlugin;

    impl Plugin for ExamplePlugin {
        fn name(&self) -> &str {
            "example"
        }

        fn hook_types(&self) -> Vec<(String, HookFactory)> {
            let factory: HookFactory = Arc::new(|| Arc::new(Notify) as Arc<dyn Hook>);
            vec![("example.Notify".to_string(), factory)]
        }

        fn massagers(&self) -> Vec<Massager> {
            vec![
                Massager::integer("instance", "port"),
                Massager::hooks("instance", "hooks"),
            ]
        }

        fn macro_cleaners(&self) -> Vec<(String, MacroCleaner)> {
            let cleaner: MacroCleaner = Arc::new(|section: &mut Section| {
                section.remove("ip");
            });
            vec![("instance".to_string(), cleaner)]
        }
    }

    #[test]
    fn plugin_registration() {
        let plugin = ExamplePlugin;
        let registry = Registry::new([&plugin as &dyn Plugin]).unwrap();

        assert_eq!(registry.massagers().len(), 2);
        assert!(registry.macro_cleaner("instance").is_some());
        assert!(registry.macro_cleaner("volume").is_none());
        let hook = registry.create_hook("example.Notify").unwrap();
        assert_eq!(hook.name(), "example.Notify");
    }

    #[test]
    fn hooks_massager_resolves_names() {
        let plugin = ExamplePlugin;
        let registry = Registry::new([&plugin as &dyn Plugin]).unwrap();

        let mut section = Section::new("instance", "web");
        let names = ConfigValue::detached("example.Notify example.Notify", "/");
        section.set("hooks", names);
        let Some(crate::Value::Hooks(hooks)) = section.get("hooks", &registry).unwrap() else {
            panic!("expected hooks");
        };
        assert_eq!(hooks.names(), vec!["example.Notify", "example.Notify"]);

        section.set("hooks", ConfigValue::detached("example.Missing", "/"));
        let err = section.get("hooks", &registry).unwrap_err();
        assert!(
            matches!(&err, Error::HookResolution { name, .. } if name == "example.Missing"),
            "{err:?}"
        );
    }

    #[test]
    fn builtin_massager_types() {
        let registry = Registry::default();
        let massager = registry
            .create_massager("macroconf.BooleanMassager", "global", "debug")
            .unwrap();
        assert_eq!(massager, Massager::boolean("global", "debug"));

        let err = registry
            .create_massager("macroconf.Nope", "global", "debug")
            .unwrap_err();
        assert!(matches!(err, Error::MassagerResolution { .. }));
    }
}
