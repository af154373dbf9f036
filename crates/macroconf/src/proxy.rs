//! proxy sections
//!
//! A [ProxySection] lets one section stand in for another one: reads fall back to the delegate for
//! keys the proxy doesn't define itself, while every write and removal is applied to both.
//!
//! The delegate is bound lazily. It is either given directly or looked up by id the first time it
//! is needed, so proxies can be created before their target exists. Binding to a section handed out
//! by the [crate::Store] makes writes through the proxy visible to the store.
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::section::{Item, Section};
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

/// A section several owners can read and write
pub type SharedSection = Rc<RefCell<Section>>;

/// Resolves a delegate id to a live section
pub type TargetLookup = Box<dyn Fn(&str) -> Option<SharedSection>>;

pub enum ProxyTarget {
    Direct(SharedSection),
    Deferred { id: String, lookup: TargetLookup },
}

impl std::fmt::Debug for ProxyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyTarget::Direct(section) => f
                .debug_tuple("Direct")
                .field(&section.borrow().id())
                .finish(),
            ProxyTarget::Deferred { id, .. } => f.debug_struct("Deferred").field("id", id).finish(),
        }
    }
}

#[derive(Debug)]
pub struct ProxySection {
    local: Section,
    target: ProxyTarget,
    delegate: OnceCell<SharedSection>,
}

impl ProxySection {
    pub fn new(local: Section, delegate: SharedSection) -> Self {
        Self {
            local,
            target: ProxyTarget::Direct(delegate),
            delegate: OnceCell::new(),
        }
    }

    /// Proxy whose delegate is looked up as `id` on first access
    pub fn deferred(
        local: Section,
        id: impl Into<String>,
        lookup: impl Fn(&str) -> Option<SharedSection> + 'static,
    ) -> Self {
        Self {
            local,
            target: ProxyTarget::Deferred {
                id: id.into(),
                lookup: Box::new(lookup),
            },
            delegate: OnceCell::new(),
        }
    }

    /// id of the section owning this proxy
    pub fn owner(&self) -> String {
        self.local.id()
    }

    /// Keys set on the proxy itself
    pub fn local(&self) -> &Section {
        &self.local
    }

    /// The bound delegate, resolving it on first access
    pub fn delegate(&self) -> Result<SharedSection> {
        if let Some(delegate) = self.delegate.get() {
            return Ok(delegate.clone());
        }

        let delegate = match &self.target {
            ProxyTarget::Direct(section) => section.clone(),
            ProxyTarget::Deferred { id, lookup } => {
                lookup(id).ok_or_else(|| Error::ProxyTargetNotFound {
                    target: id.clone(),
                    owner: self.owner(),
                })?
            }
        };

        tracing::debug!(owner = %self.owner(), delegate = %delegate.borrow().id(), "proxy bound");
        Ok(self.delegate.get_or_init(|| delegate).clone())
    }

    /// Set a key on the proxy and its delegate
    pub fn set(&mut self, key: impl Into<String>, item: impl Into<Item>) -> Result<()> {
        let delegate = self.delegate()?;
        let key = key.into();
        let item = item.into();

        delegate.borrow_mut().set(key.clone(), item.clone());
        self.local.set(key, item);
        Ok(())
    }

    /// Remove a key from the proxy and its delegate
    pub fn remove(&mut self, key: &str) -> Result<Option<Item>> {
        let delegate = self.delegate()?;

        let removed = delegate.borrow_mut().remove(key);
        Ok(self.local.remove(key).or(removed))
    }

    /// Local keys win, everything else comes from the delegate
    pub fn get(&self, key: &str, registry: &Registry) -> Result<Option<Value>> {
        if let Some(value) = self.local.get(key, registry)? {
            return Ok(Some(value));
        }

        let delegate = self.delegate()?;
        let delegate = delegate.borrow();
        delegate.get(key, registry)
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Item>> {
        if let Some(item) = self.local.get_raw(key) {
            return Ok(Some(item.clone()));
        }

        Ok(self.delegate()?.borrow().get_raw(key).cloned())
    }

    /// Local keys followed by the delegate's remaining ones
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.local.keys().map(str::to_string).collect();

        let delegate = self.delegate()?;
        for key in delegate.borrow().keys() {
            if !self.local.contains_key(key) {
                keys.push(key.to_string());
            }
        }

        Ok(keys)
    }

    pub fn to_value(&self, registry: &Registry) -> Result<Value> {
        let keys = self.keys()?;
        let mut object = IndexMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(&key, registry)? {
                object.insert(key, value);
            }
        }

        Ok(Value::Object(object))
    }
}

/// The sections of one group, keyed by name
///
/// Clones are handles to the same sections. The [crate::Store] keeps every group this way, so a
/// section inserted or changed through any handle is seen by the store and by every lookup.
#[derive(Debug, Default, Clone)]
pub struct SharedSections(Rc<RefCell<IndexMap<String, SharedSection>>>);

impl SharedSections {
    /// Add a section, replacing one with the same name
    pub fn insert(&self, section: Section) -> SharedSection {
        let name = section.name().to_string();
        let shared = Rc::new(RefCell::new(section));
        self.0.borrow_mut().insert(name, shared.clone());
        shared
    }

    pub fn get(&self, name: &str) -> Option<SharedSection> {
        self.0.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.borrow().contains_key(name)
    }

    /// Handles to all sections, in insertion order
    pub fn sections(&self) -> Vec<SharedSection> {
        self.0.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Lookup for [ProxySection::deferred], resolving against the sections present when called
    pub fn lookup(&self) -> impl Fn(&str) -> Option<SharedSection> + 'static {
        let sections = self.clone();
        move |name: &str| sections.get(name)
    }
}

impl From<IndexMap<String, Section>> for SharedSections {
    fn from(sections: IndexMap<String, Section>) -> Self {
        let sections = sections
            .into_iter()
            .map(|(name, section)| (name, Rc::new(RefCell::new(section))))
            .collect();

        Self(Rc::new(RefCell::new(sections)))
    }
}
