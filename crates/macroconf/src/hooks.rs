//! lifecycle hooks
//!
//! A `hooks` key lists hook names separated by whitespace. The hooks massager looks each name up in
//! the [crate::Registry] and instantiates it. Callers then run the callbacks in declaration order.
use crate::section::Section;
use std::sync::Arc;

/// Callbacks around the lifecycle of whatever a section configures
///
/// All callbacks default to doing nothing.
pub trait Hook: std::fmt::Debug + Send + Sync {
    /// Name the hook was registered with
    fn name(&self) -> &str;

    fn before_start(&self, _section: &Section) {}
    fn after_start(&self, _section: &Section) {}
    fn before_terminate(&self, _section: &Section) {}
    fn after_terminate(&self, _section: &Section) {}
}

/// Ordered list of instantiated hooks
#[derive(Debug, Clone, Default)]
pub struct Hooks(Vec<Arc<dyn Hook>>);

impl Hooks {
    pub fn new(hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self(hooks)
    }

    pub fn push(&mut self, hook: Arc<dyn Hook>) {
        self.0.push(hook)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Hook>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|hook| hook.name()).collect()
    }

    pub fn before_start(&self, section: &Section) {
        self.each(|hook| hook.before_start(section))
    }

    pub fn after_start(&self, section: &Section) {
        self.each(|hook| hook.after_start(section))
    }

    pub fn before_terminate(&self, section: &Section) {
        self.each(|hook| hook.before_terminate(section))
    }

    pub fn after_terminate(&self, section: &Section) {
        self.each(|hook| hook.after_terminate(section))
    }

    fn each(&self, f: impl Fn(&dyn Hook)) {
        for hook in &self.0 {
            tracing::trace!(hook = hook.name(), "calling hook");
            f(hook.as_ref());
        }
    }
}

// hooks carry no configuration, the name is their identity
impl PartialEq for Hooks {
    fn eq(&self, other: &Self) -> bool {
        self.names() == other.names()
    }
}
