//! massagers: per key type coercion
//!
//! A [Massager] is bound to a `(group, key)` pair, where the group may be [ANY_GROUP]. Massagers
//! are applied lazily, every time a key is read, see [dispatch] for the lookup order.
//!
//! Built-in variants cover booleans, integers, paths, user names, hook lists and startup scripts.
//! Everything else is a [CustomMassager] provided by a [crate::Plugin].
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::registry::Registry;
use crate::section::{ConfigValue, Section};
use crate::util;
use crate::value::{StartupScript, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Group wildcard, massagers registered for it apply to every group
pub const ANY_GROUP: &str = "*";

/// User defined massager
pub trait CustomMassager: std::fmt::Debug + Send + Sync {
    /// Name of the implementation
    ///
    /// Two custom massagers with the same name are considered equal.
    fn name(&self) -> &str;

    fn massage(&self, context: &MassageContext<'_>, value: &ConfigValue) -> Result<Value>;
}

/// Everything a massager may look at besides the raw value
#[derive(derive_new::new, Debug)]
pub struct MassageContext<'a> {
    pub registry: &'a Registry,
    /// The section that is being read. Its group is the actual group, also for wildcard massagers.
    pub section: &'a Section,
    pub key: &'a str,
}

impl MassageContext<'_> {
    pub fn group(&self) -> &str {
        self.section.group()
    }
}

#[derive(Debug, Clone)]
pub enum MassagerKind {
    /// Returns the raw string
    Identity,
    /// `true`/`yes`/`on` and `false`/`no`/`off`, case insensitive
    Boolean,
    /// Decimal i64
    Integer,
    /// Home expanded, relative to the directory of the defining file, normalized
    Path,
    /// `*` is the user owning the process, looked up by uid
    User,
    /// Whitespace separated hook names
    Hooks,
    /// Path with optional `gzip:` prefix
    StartupScript,
    Custom(Arc<dyn CustomMassager>),
}

impl MassagerKind {
    /// All built-in variants
    pub fn builtins() -> [MassagerKind; 7] {
        use MassagerKind::*;
        [Identity, Boolean, Integer, Path, User, Hooks, StartupScript]
    }

    pub fn name(&self) -> &str {
        match self {
            MassagerKind::Identity => "macroconf.BaseMassager",
            MassagerKind::Boolean => "macroconf.BooleanMassager",
            MassagerKind::Integer => "macroconf.IntegerMassager",
            MassagerKind::Path => "macroconf.PathMassager",
            MassagerKind::User => "macroconf.UserMassager",
            MassagerKind::Hooks => "macroconf.HooksMassager",
            MassagerKind::StartupScript => "macroconf.StartupScriptMassager",
            MassagerKind::Custom(custom) => custom.name(),
        }
    }
}

impl PartialEq for MassagerKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MassagerKind::Custom(a), MassagerKind::Custom(b)) => a.name() == b.name(),
            (MassagerKind::Custom(_), _) | (_, MassagerKind::Custom(_)) => false,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// A [MassagerKind] bound to `(group, key)`
#[derive(Debug, Clone, PartialEq)]
pub struct Massager {
    group: String,
    key: String,
    kind: MassagerKind,
}

impl Massager {
    pub fn new(group: impl Into<String>, key: impl Into<String>, kind: MassagerKind) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
            kind,
        }
    }

    pub fn boolean(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::Boolean)
    }

    pub fn integer(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::Integer)
    }

    pub fn path(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::Path)
    }

    pub fn user(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::User)
    }

    pub fn hooks(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::Hooks)
    }

    pub fn startup_script(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(group, key, MassagerKind::StartupScript)
    }

    pub fn custom(
        group: impl Into<String>,
        key: impl Into<String>,
        custom: impl CustomMassager + 'static,
    ) -> Self {
        Self::new(group, key, MassagerKind::Custom(Arc::new(custom)))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &MassagerKind {
        &self.kind
    }

    pub fn massage(&self, context: &MassageContext<'_>, value: &ConfigValue) -> Result<Value> {
        let raw = value.as_str();
        match &self.kind {
            MassagerKind::Identity => Ok(raw.into()),
            MassagerKind::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(Value::Boolean(true)),
                "false" | "no" | "off" => Ok(Value::Boolean(false)),
                _ => Err(coercion_error(context, value, "boolean")),
            },
            MassagerKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| coercion_error(context, value, "integer")),
            MassagerKind::Path => Ok(Value::Path(util::resolve_path(raw, value.base_dir()))),
            MassagerKind::User => {
                if raw != "*" {
                    return Ok(raw.into());
                }

                util::current_user()
                    .map(Value::String)
                    .ok_or_else(|| Error::UnknownUser {
                        key: context.key.to_string(),
                    })
            }
            MassagerKind::Hooks => {
                let mut hooks = Hooks::default();
                for name in raw.split_whitespace() {
                    hooks.push(context.registry.create_hook(name)?);
                }
                Ok(Value::Hooks(hooks))
            }
            MassagerKind::StartupScript => {
                let (gzip, path) = match raw.strip_prefix("gzip:") {
                    Some(path) => (true, path),
                    None => (false, raw),
                };
                let path = util::resolve_path(path.trim(), value.base_dir());
                Ok(Value::StartupScript(StartupScript::new(path, gzip)))
            }
            MassagerKind::Custom(custom) => custom.massage(context, value),
        }
    }
}

fn coercion_error(
    context: &MassageContext<'_>,
    value: &ConfigValue,
    expected: &'static str,
) -> Error {
    Error::TypeCoercion {
        key: context.key.to_string(),
        value: value.as_str().to_string(),
        expected,
        origin: value.origin().cloned(),
    }
}

/// Massagers keyed by `(group, key)`
///
/// Registering a second, different massager for the same pair is an error. Registering an equal one
/// again does nothing.
#[derive(Debug, Clone, Default)]
pub struct MassagerSet {
    massagers: IndexMap<(String, String), Massager>,
}

impl MassagerSet {
    pub fn add(&mut self, massager: Massager) -> Result<()> {
        let id = (massager.group.clone(), massager.key.clone());
        if let Some(existing) = self.massagers.get(&id) {
            if existing == &massager {
                return Ok(());
            }

            return Err(Error::ConflictingMassager {
                group: id.0,
                key: id.1,
                existing: existing.kind.name().to_string(),
                new: massager.kind.name().to_string(),
            });
        }

        tracing::debug!(
            group = %id.0,
            key = %id.1,
            kind = massager.kind.name(),
            "massager registered"
        );
        self.massagers.insert(id, massager);
        Ok(())
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&Massager> {
        self.massagers.get(&(group.to_string(), key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Massager> {
        self.massagers.values()
    }

    pub fn len(&self) -> usize {
        self.massagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.massagers.is_empty()
    }
}

/// Massage `value`, stored under `key` in `section`
///
/// First match wins:
/// 1. massager registered on the section itself for `(group, key)`
/// 2. global massager for `(group, key)`
/// 3. global massager for `(*, key)`
/// 4. none, the raw string is returned
pub(crate) fn dispatch(
    registry: &Registry,
    section: &Section,
    key: &str,
    value: &ConfigValue,
) -> Result<Value> {
    let group = section.group();
    let massager = section
        .massagers()
        .get(group, key)
        .or_else(|| registry.massagers().get(group, key))
        .or_else(|| registry.massagers().get(ANY_GROUP, key));

    let Some(massager) = massager else {
        return Ok(value.as_str().into());
    };

    tracing::trace!(section = %section.id(), key, massager = massager.kind.name(), "massage");
    let context = MassageContext::new(registry, section, key);
    massager.massage(&context, value)
}
