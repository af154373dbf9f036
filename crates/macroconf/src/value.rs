//! value representation
//!
//! Raw configuration values are strings. Massagers turn them into one of the following types
//! - boolean (true/false)
//! - integer (signed, i64)
//! - string (utf-8, also used for unmassaged values)
//! - path (absolute and normalized)
//! - list (of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//! - hooks (ordered list of [crate::hooks::Hook] instances)
//! - startup script (a path plus a compression flag)
//! - section (nested [Section], returned as stored)
//!
//! Only the output model is serializable. There is no deserialization, values always come from
//! configuration files.
use crate::hooks::Hooks;
use crate::section::{Item, Section};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};
use std::path::PathBuf;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    String(String),
    Path(PathBuf),
    List(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
    Hooks(Hooks),
    StartupScript(StartupScript),
    Section(Section),
}

/// Result of the startup script massager
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct StartupScript {
    pub path: PathBuf,
    /// `gzip:` prefix was present
    pub gzip: bool,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Path(value) => serializer.serialize_str(&value.to_string_lossy()),
            Value::List(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Hooks(hooks) => {
                let mut ser = serializer.serialize_seq(Some(hooks.len()))?;
                for hook in hooks.iter() {
                    ser.serialize_element(hook.name())?;
                }
                ser.end()
            }
            Value::StartupScript(script) => {
                let mut ser = serializer.serialize_map(Some(2))?;
                ser.serialize_entry("path", &script.path.to_string_lossy())?;
                ser.serialize_entry("gzip", &script.gzip)?;
                ser.end()
            }
            // nested sections are serialized raw, they have no registry to massage with
            Value::Section(section) => serialize_raw_section(section, serializer),
        }
    }
}

fn serialize_raw_section<S: Serializer>(
    section: &Section,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    struct Raw<'a>(&'a Section);

    impl serde::ser::Serialize for Raw<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serialize_raw_section(self.0, serializer)
        }
    }

    let mut ser = serializer.serialize_map(Some(section.len()))?;
    for (key, item) in section.iter() {
        match item {
            Item::Value(value) => ser.serialize_entry(key, value.as_str())?,
            Item::Section(nested) => ser.serialize_entry(key, &Raw(nested))?,
        }
    }
    ser.end()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::section::ConfigValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn serialize_json() {
        let mut inner = Section::new("macro", "inner");
        inner.set("user", ConfigValue::detached("root", "/"));

        let value = Value::Object(
            [
                ("debug".to_string(), Value::from(true)),
                ("port".to_string(), Value::from(22i64)),
                ("names".to_string(), Value::from(vec!["a", "b"])),
                (
                    "script".to_string(),
                    Value::StartupScript(StartupScript::new("/etc/init.sh".into(), true)),
                ),
                ("inner".to_string(), Value::Section(inner)),
            ]
            .into_iter()
            .collect(),
        );

        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            concat!(
                r#"{"debug":true,"port":22,"names":["a","b"],"#,
                r#""script":{"path":"/etc/init.sh","gzip":true},"inner":{"user":"root"}}"#
            )
        );
    }
}
