//! the configuration store
//!
//! [Store::parse] is the single entry point: load the source and its `extends` chain, fill the
//! sections (weakest file first), register `massagers` declarations and finally expand macros.
//!
//! After parsing, values are read through [Store::get] and massaged on every read. Sections are
//! handed out as shared handles ([SharedSection]), changes made through them, e.g. by a
//! [crate::proxy::ProxySection], are what later reads see.
//! [Store::effective] builds a one-off copy of a section with overrides applied on top.
use crate::error::{Error, Result};
use crate::ini;
use crate::macros::{self, Groups};
use crate::massager::{Massager, ANY_GROUP};
use crate::proxy::{SharedSection, SharedSections};
use crate::registry::{Plugin, Registry};
use crate::section::{ConfigValue, Item, Origin, Section};
use crate::sources::{self, Source, SourceFile};
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

/// Reserved key declaring massagers, never stored
pub const MASSAGERS_KEY: &str = "massagers";

#[derive(Debug)]
pub struct Store {
    groups: IndexMap<String, SharedSections>,
    registry: Registry,
    /// directory of the root source, overrides resolve relative paths against it
    base_dir: PathBuf,
    /// loaded files, weakest first
    files: Vec<PathBuf>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            groups: Default::default(),
            registry: Registry::default(),
            base_dir: PathBuf::from("."),
            files: vec![],
        }
    }
}

impl Store {
    /// Empty store with everything the plugins provide registered
    pub fn new<'p>(plugins: impl IntoIterator<Item = &'p dyn Plugin>) -> Result<Self> {
        Ok(Self {
            registry: Registry::new(plugins)?,
            ..Default::default()
        })
    }

    /// Load `source` into the store
    ///
    /// Consumes the store, a store that failed to parse must not be used.
    pub fn parse(mut self, source: impl Into<Source>) -> Result<Self> {
        let files = sources::load(source.into())?;

        if let Some(root) = files.last() {
            self.base_dir = root.base_dir.clone();
        }

        let mut groups: Groups = self
            .groups
            .iter()
            .map(|(group, sections)| (group.clone(), detach(sections)))
            .collect();

        for file in &files {
            self.apply(&mut groups, file)?;
        }

        macros::expand_all(&mut groups, &self.registry)?;

        self.groups = groups
            .into_iter()
            .map(|(group, sections)| (group, SharedSections::from(sections)))
            .collect();
        self.files = files.into_iter().filter_map(|file| file.path).collect();
        tracing::debug!(files = self.files.len(), "configuration parsed");
        Ok(self)
    }

    fn apply(&mut self, groups: &mut Groups, file: &SourceFile) -> Result<()> {
        for (header, keys) in &file.sections {
            let (group, name) = ini::split_header(header);
            entry(groups, group, name);

            for (key, raw) in keys {
                if key == MASSAGERS_KEY {
                    self.declare_massagers(groups, group, name, &raw.value)?;
                    continue;
                }

                let value = ConfigValue::new(
                    raw.value.clone(),
                    file.base_dir.clone(),
                    Some(Origin::new(file.path.clone(), raw.line)),
                );
                entry(groups, group, name).set(key.clone(), value);
            }
        }

        Ok(())
    }

    /// Register the massagers of a `massagers` value found in `group:name`
    ///
    /// One declaration per line, `[[group[:section]]:]key = name`:
    /// - `key`: only this section
    /// - `group:key`: every section of `group`, `*` for all groups, empty for the current group
    /// - `group:section:key`: only `group:section`, empty parts mean the current group/section
    fn declare_massagers(
        &mut self,
        groups: &mut Groups,
        group: &str,
        name: &str,
        spec: &str,
    ) -> Result<()> {
        for declaration in spec.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let invalid = |reason| Error::InvalidMassagerDeclaration {
                section: format!("{group}:{name}"),
                declaration: declaration.to_string(),
                reason,
            };

            let (target, massager_name) = declaration
                .split_once('=')
                .ok_or_else(|| invalid("missing '='"))?;
            let massager_name = massager_name.trim();
            if massager_name.is_empty() {
                return Err(invalid("missing massager name"));
            }

            let parts: Vec<&str> = target.trim().split(':').map(str::trim).collect();

            let (target_group, target_section, key) = match parts.as_slice() {
                [key] => (group.to_string(), Some(name.to_string()), *key),
                [target_group, key] => (or_current(target_group, group), None, *key),
                [target_group, _, _] if *target_group == ANY_GROUP => {
                    return Err(invalid("'*' can't be combined with a section"))
                }
                [target_group, target_section, key] => (
                    or_current(target_group, group),
                    Some(or_current(target_section, name)),
                    *key,
                ),
                _ => return Err(invalid("too many ':' separated parts")),
            };

            if key.is_empty() {
                return Err(invalid("missing key"));
            }

            let massager = self
                .registry
                .create_massager(massager_name, &target_group, key)?;

            match target_section {
                Some(target_section) => {
                    entry(groups, &target_group, &target_section).add_massager(massager)?
                }
                None => self.registry.add_massager(massager)?,
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a global massager, same conflict rules as during parsing
    pub fn add_massager(&mut self, massager: Massager) -> Result<()> {
        self.registry.add_massager(massager)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Files the configuration was loaded from, weakest first
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Live handle to the sections of `group`
    pub fn group(&self, group: &str) -> Option<SharedSections> {
        self.groups.get(group).cloned()
    }

    /// Like [Self::group], creating the group on first access
    pub fn group_entry(&mut self, group: &str) -> SharedSections {
        self.groups.entry(group.to_string()).or_default().clone()
    }

    pub fn sections(&self, group: &str) -> Vec<SharedSection> {
        self.groups
            .get(group)
            .map(SharedSections::sections)
            .unwrap_or_default()
    }

    pub fn section(&self, group: &str, name: &str) -> Option<SharedSection> {
        self.groups
            .get(group)
            .and_then(|sections| sections.get(name))
    }

    /// Get a section, creating an empty one on first access
    pub fn section_entry(&mut self, group: &str, name: &str) -> SharedSection {
        let sections = self.group_entry(group);
        match sections.get(name) {
            Some(section) => section,
            None => sections.insert(Section::new(group, name)),
        }
    }

    /// Read and massage a single key, `None` if the section or key doesn't exist
    pub fn get(&self, group: &str, name: &str, key: &str) -> Result<Option<Value>> {
        let Some(section) = self.section(group, name) else {
            return Ok(None);
        };

        let section = section.borrow();
        section.get(key, &self.registry)
    }

    /// Copy of `group:name` with `overrides` applied on top
    ///
    /// Overridden keys are massaged right away, so invalid overrides fail here. The store is never
    /// modified.
    pub fn effective<K, V>(
        &self,
        group: &str,
        name: &str,
        overrides: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Effective<'_>>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let shared = self
            .section(group, name)
            .ok_or_else(|| Error::SectionNotFound {
                group: group.to_string(),
                name: name.to_string(),
            })?;
        let mut section = shared.borrow().clone();

        let mut overridden = IndexSet::new();
        for (key, value) in overrides {
            let key = key.into();
            section.set(key.clone(), ConfigValue::detached(value, &self.base_dir));
            overridden.insert(key);
        }

        let mut massaged = IndexMap::with_capacity(overridden.len());
        for key in &overridden {
            if let Some(value) = section.get(key, &self.registry)? {
                massaged.insert(key.clone(), value);
            }
        }

        tracing::debug!(section = %section.id(), overrides = massaged.len(), "effective section");
        Ok(Effective {
            section,
            registry: &self.registry,
            base_dir: self.base_dir.clone(),
            overridden,
            massaged,
        })
    }

    /// Massage everything into `group -> section -> key -> value`
    pub fn to_value(&self) -> Result<Value> {
        let mut groups = IndexMap::with_capacity(self.groups.len());
        for (group, sections) in &self.groups {
            let mut object = IndexMap::with_capacity(sections.len());
            for section in sections.sections() {
                let section = section.borrow();
                let value = section.to_value(&self.registry)?;
                object.insert(section.name().to_string(), value);
            }
            groups.insert(group.clone(), Value::Object(object));
        }

        Ok(Value::Object(groups))
    }
}

/// Section of the groups being parsed, created on first access
fn entry<'g>(groups: &'g mut Groups, group: &str, name: &str) -> &'g mut Section {
    groups
        .entry(group.to_string())
        .or_default()
        .entry(name.to_string())
        .or_insert_with(|| Section::new(group, name))
}

/// Plain copies of shared sections, for parsing into a store that already holds some
fn detach(sections: &SharedSections) -> IndexMap<String, Section> {
    sections
        .sections()
        .into_iter()
        .map(|section| {
            let section = section.borrow().clone();
            (section.name().to_string(), section)
        })
        .collect()
}

/// Empty declaration parts refer to the declaring section
fn or_current(part: &str, current: &str) -> String {
    match part {
        "" => current.to_string(),
        part => part.to_string(),
    }
}

/// A section with one-off overrides, see [Store::effective]
///
/// Owns its copy of the section, changes never reach the store.
#[derive(Debug)]
pub struct Effective<'s> {
    section: Section,
    registry: &'s Registry,
    base_dir: PathBuf,
    /// keys that may differ from the store: overrides, later `set` and `remove` calls
    overridden: IndexSet<String>,
    /// overrides massaged when the copy was created
    massaged: IndexMap<String, Value>,
}

impl Effective<'_> {
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Whether `key` was overridden, set or removed on this copy
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overridden.contains(key)
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(value) = self.massaged.get(key) {
            return Ok(Some(value.clone()));
        }

        self.section.get(key, self.registry)
    }

    pub fn get_raw(&self, key: &str) -> Option<&Item> {
        self.section.get_raw(key)
    }

    /// Change a key of this copy only
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.massaged.shift_remove(&key);
        self.overridden.insert(key.clone());
        self.section
            .set(key, ConfigValue::detached(value, &self.base_dir));
    }

    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.massaged.shift_remove(key);
        self.overridden.insert(key.to_string());
        self.section.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.section.keys()
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut object = IndexMap::with_capacity(self.section.len());
        for key in self.section.keys() {
            if let Some(value) = self.get(key)? {
                object.insert(key.to_string(), value);
            }
        }

        Ok(Value::Object(object))
    }
}

/// Utility macro to create a parsed [Store] from inline text
///
/// Relative paths resolve against the current directory
/// ```
/// # use macroconf::config_store;
/// let store = config_store!("[instance:web]\nip = 10.0.0.1\n");
/// assert!(store.section("instance", "web").is_some());
/// ```
///
/// ...or against a given directory
/// ```
/// # use macroconf::config_store;
/// let store = config_store!("[global]\nfoo = bar\n", "/etc/app");
/// assert_eq!(store.base_dir(), std::path::Path::new("/etc/app"));
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use macroconf::config_store;
/// config_store!("key outside of a section = 1");
/// ```
#[macro_export]
macro_rules! config_store {
    { $text:expr } => {
        $crate::config_store!($text, ".")
    };
    { $text:expr, $base_dir:expr } => {
        $crate::Store::default()
            .parse($crate::Source::text($text, $base_dir))
            .expect("store must parse")
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config_store;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = "\
[global]
massagers =
    *:port = macroconf.IntegerMassager
    instance:debug = macroconf.BooleanMassager

[instance:web]
port = 80
debug = yes
value = 1
massagers = value = macroconf.IntegerMassager

[volume:data]
port = 2049
value = 1
";

    fn get(store: &Store, group: &str, name: &str, key: &str) -> Option<Value> {
        store.get(group, name, key).unwrap()
    }

    #[test]
    fn massager_scopes() {
        let store = config_store!(CONFIG);

        assert_eq!(
            get(&store, "instance", "web", "port"),
            Some(Value::Integer(80))
        );
        assert_eq!(
            get(&store, "volume", "data", "port"),
            Some(Value::Integer(2049))
        );
        assert_eq!(get(&store, "instance", "web", "debug"), Some(true.into()));
        // section local
        assert_eq!(
            get(&store, "instance", "web", "value"),
            Some(Value::Integer(1))
        );
        assert_eq!(get(&store, "volume", "data", "value"), Some("1".into()));
        // never stored
        let global = store.section("global", "global").unwrap();
        assert!(!global.borrow().contains_key(MASSAGERS_KEY));
    }

    #[test]
    fn massager_for_other_section() {
        let text = "\
[global]
massagers =
    instance:db:port = macroconf.IntegerMassager
    :flag = macroconf.BooleanMassager
[instance:db]
port = 5432
[instance:web]
port = 80
[global:other]
flag = off
";
        let store = config_store!(text);

        assert_eq!(
            get(&store, "instance", "db", "port"),
            Some(Value::Integer(5432))
        );
        assert_eq!(get(&store, "instance", "web", "port"), Some("80".into()));
        assert_eq!(get(&store, "global", "other", "flag"), Some(false.into()));
    }

    #[test]
    fn invalid_declarations() {
        for (spec, reason) in [
            ("port macroconf.IntegerMassager", "missing '='"),
            (
                "a:b:c:port = macroconf.IntegerMassager",
                "too many ':' separated parts",
            ),
            (
                "*:web:port = macroconf.IntegerMassager",
                "'*' can't be combined with a section",
            ),
            ("instance: = macroconf.IntegerMassager", "missing key"),
            ("port =", "missing massager name"),
        ] {
            let text = format!("[instance:web]\nmassagers = {spec}\n");
            let err = Store::default()
                .parse(Source::text(text, "."))
                .unwrap_err();

            match err {
                Error::InvalidMassagerDeclaration {
                    section,
                    reason: actual,
                    ..
                } => {
                    assert_eq!(section, "instance:web");
                    assert_eq!(actual, reason, "{spec}");
                }
                other => panic!("unexpected error for {spec}: {other:?}"),
            }
        }
    }

    #[test]
    fn unresolvable_massager() {
        let text = "[global]\nmassagers = :x = plugin.Missing\n";
        let err = Store::default()
            .parse(Source::text(text, "."))
            .unwrap_err();

        match err {
            Error::MassagerResolution { name, .. } => assert_eq!(name, "plugin.Missing"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn conflicting_declarations() {
        let text = "\
[global]
massagers =
    *:x = macroconf.IntegerMassager
    *:x = macroconf.BooleanMassager
";
        let err = Store::default()
            .parse(Source::text(text, "."))
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingMassager { .. }));

        let mut store = config_store!("[global]\nmassagers = *:x = macroconf.IntegerMassager\n");
        store
            .add_massager(Massager::integer(ANY_GROUP, "x"))
            .unwrap();
        let conflicting = Massager::boolean(ANY_GROUP, "x");
        assert!(store.add_massager(conflicting).is_err());
    }

    #[test]
    fn provenance() {
        let store = config_store!("[global]\n\nfoo = bar\n");
        let section = store.section("global", "global").unwrap();
        let section = section.borrow();

        assert_eq!(
            section.origins().collect::<Vec<_>>(),
            vec![("foo", Some(&Origin::new(None, 3)))]
        );
    }

    #[test]
    fn writes_through_section_handles_are_read_back() {
        let mut store = config_store!(CONFIG);

        let web = store.section("instance", "web").unwrap();
        web.borrow_mut()
            .set("port", ConfigValue::detached("8080", "/"));
        assert_eq!(
            get(&store, "instance", "web", "port"),
            Some(Value::Integer(8080))
        );

        store
            .section_entry("instance", "db")
            .borrow_mut()
            .set("port", ConfigValue::detached("5432", "/"));
        assert_eq!(
            get(&store, "instance", "db", "port"),
            Some(Value::Integer(5432))
        );
        assert_eq!(store.sections("instance").len(), 2);
    }

    #[test]
    fn effective_does_not_modify_the_store() {
        let store = config_store!(CONFIG);

        let mut effective = store
            .effective("instance", "web", [("value", "2"), ("extra", "x")])
            .unwrap();

        assert_eq!(effective.get("value").unwrap(), Some(Value::Integer(2)));
        assert_eq!(effective.get("port").unwrap(), Some(Value::Integer(80)));
        assert_eq!(effective.get("extra").unwrap(), Some("x".into()));
        assert!(effective.is_overridden("value"));
        assert!(!effective.is_overridden("port"));
        assert_eq!(
            effective.keys().collect::<Vec<_>>(),
            vec!["port", "debug", "value", "extra"]
        );

        effective.set("port", "8080");
        effective.remove("debug");
        assert_eq!(effective.get("port").unwrap(), Some(Value::Integer(8080)));
        assert!(effective.is_overridden("port"));
        assert!(effective.is_overridden("debug"));

        assert_eq!(
            get(&store, "instance", "web", "value"),
            Some(Value::Integer(1))
        );
        assert_eq!(
            get(&store, "instance", "web", "port"),
            Some(Value::Integer(80))
        );
        assert_eq!(get(&store, "instance", "web", "debug"), Some(true.into()));
        let web = store.section("instance", "web").unwrap();
        assert!(!web.borrow().contains_key("extra"));
    }

    #[test]
    fn effective_massages_overrides_eagerly() {
        let store = config_store!(CONFIG);

        let err = store
            .effective("instance", "web", [("port", "eighty")])
            .unwrap_err();
        assert!(matches!(err, Error::TypeCoercion { .. }));

        let err = store
            .effective("instance", "missing", Vec::<(String, String)>::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Section 'instance:missing' not found");
    }

    #[test]
    fn whole_store_value() {
        let store = config_store!("[a]\nx = 1\n[group:b]\ny = 2\n");

        assert_eq!(
            serde_json::to_string(&store.to_value().unwrap()).unwrap(),
            r#"{"global":{"a":{"x":"1"}},"group":{"b":{"y":"2"}}}"#
        );
    }
}
