//! sections and their values
//!
//! A [Section] is a named bag of keys inside a section group. Each key holds an [Item]: either a
//! raw [ConfigValue] that remembers where it was defined, or a nested [Section].
//!
//! Sections don't know the [Registry] they belong to. Reads that should be massaged take it as an
//! explicit argument (see [Section::get]).
use crate::error::Result;
use crate::massager::{self, Massager, MassagerSet};
use crate::registry::Registry;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Synthetic key resolving to the name of the section
pub const NAME_KEY: &str = "__name__";
/// Synthetic key resolving to the group of the section
pub const GROUPNAME_KEY: &str = "__groupname__";

/// Where a value was defined
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// `None` for in-memory sources
    pub path: Option<PathBuf>,
    pub line: usize,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}", path.display(), self.line),
            None => write!(f, "<text>:{}", self.line),
        }
    }
}

/// A raw value with provenance
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    value: String,
    /// Relative paths in `value` are resolved against this directory
    base_dir: PathBuf,
    origin: Option<Origin>,
}

impl ConfigValue {
    /// A value that wasn't read from any source, e.g. an override
    pub fn detached(value: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self::new(value.into(), base_dir.into(), None)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }
}

/// Content of a single key
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Value(ConfigValue),
    Section(Section),
}

impl Item {
    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            Item::Value(value) => Some(value),
            Item::Section(_) => None,
        }
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.as_value().and_then(ConfigValue::origin)
    }
}

impl From<ConfigValue> for Item {
    fn from(value: ConfigValue) -> Self {
        Item::Value(value)
    }
}

impl From<Section> for Item {
    fn from(value: Section) -> Self {
        Item::Section(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Section {
    group: String,
    name: String,
    items: IndexMap<String, Item>,
    /// massagers only applied to this section
    massagers: MassagerSet,
}

// local massagers are not part of a section's identity
impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.name == other.name && self.items == other.items
    }
}

impl Section {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `group:name`
    pub fn id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    pub fn get_raw(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    /// Raw string of a key, `None` for missing keys and nested sections
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.items
            .get(key)
            .and_then(Item::as_value)
            .map(ConfigValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Store a value, returns the previous one
    pub fn set(&mut self, key: impl Into<String>, item: impl Into<Item>) -> Option<Item> {
        self.items.insert(key.into(), item.into())
    }

    /// Remove a key, keeping the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.items.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.items.iter().map(|(key, item)| (key.as_str(), item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Origin of every key, in declaration order
    pub fn origins(&self) -> impl Iterator<Item = (&str, Option<&Origin>)> {
        self.iter().map(|(key, item)| (key, item.origin()))
    }

    pub fn massagers(&self) -> &MassagerSet {
        &self.massagers
    }

    /// Register a massager that only applies to this section
    pub fn add_massager(&mut self, massager: Massager) -> Result<()> {
        self.massagers.add(massager)
    }

    /// Read a key and massage it
    ///
    /// The synthetic keys [NAME_KEY] and [GROUPNAME_KEY] always resolve. Nested sections are
    /// returned as they are.
    pub fn get(&self, key: &str, registry: &Registry) -> Result<Option<Value>> {
        match key {
            NAME_KEY => return Ok(Some(Value::String(self.name.clone()))),
            GROUPNAME_KEY => return Ok(Some(Value::String(self.group.clone()))),
            _ => {}
        }

        match self.items.get(key) {
            None => Ok(None),
            Some(Item::Section(section)) => Ok(Some(Value::Section(section.clone()))),
            Some(Item::Value(value)) => massager::dispatch(registry, self, key, value).map(Some),
        }
    }

    /// Massage all keys into a [Value::Object]
    pub fn to_value(&self, registry: &Registry) -> Result<Value> {
        let mut object = IndexMap::with_capacity(self.items.len());
        for key in self.items.keys() {
            if let Some(value) = self.get(key, registry)? {
                object.insert(key.clone(), value);
            }
        }

        Ok(Value::Object(object))
    }
}
