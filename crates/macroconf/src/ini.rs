//! line oriented section format
//!
//! ```text
//! # comment
//! ; also a comment
//! [group:name]
//! key = value
//! multi = first line
//!     continuation lines start with whitespace
//! ```
//!
//! A later definition of a key within the same section replaces the earlier one. Sections may be
//! opened more than once, their keys are merged.
use crate::error::{Error, Result};
use crate::section::Origin;
use indexmap::IndexMap;
use std::path::Path;

/// A value as written in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub value: String,
    /// 1-based line of the `key = value` line
    pub line: usize,
}

/// Sections keyed by their header text, keys in declaration order
pub type RawSections = IndexMap<String, IndexMap<String, RawValue>>;

pub fn parse(text: &str, path: Option<&Path>) -> Result<RawSections> {
    let mut sections = RawSections::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    let syntax_error = |line: usize, message: String| Error::Syntax {
        origin: Origin::new(path.map(Path::to_path_buf), line),
        message,
    };

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let is_continuation = line.starts_with(char::is_whitespace);
        if is_continuation {
            if let (Some(section), Some(key)) = (&current, &last_key) {
                if let Some(raw) = sections
                    .get_mut(section)
                    .and_then(|keys| keys.get_mut(key))
                {
                    if !raw.value.is_empty() {
                        raw.value.push('\n');
                    }
                    raw.value.push_str(trimmed);
                    continue;
                }
            }
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let Some(header) = header.strip_suffix(']') else {
                return Err(syntax_error(
                    line_number,
                    format!("unterminated section header '{trimmed}'"),
                ));
            };
            let header = header.trim();
            if header.is_empty() {
                return Err(syntax_error(
                    line_number,
                    "empty section header".to_string(),
                ));
            }

            sections.entry(header.to_string()).or_default();
            current = Some(header.to_string());
            last_key = None;
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(syntax_error(
                line_number,
                format!("expected 'key = value', found '{trimmed}'"),
            ));
        };

        let Some(section) = &current else {
            return Err(syntax_error(
                line_number,
                "key outside of a section".to_string(),
            ));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(syntax_error(line_number, "empty key".to_string()));
        }

        tracing::trace!(section = %section, key, line = line_number, "parsed value");
        let raw = RawValue {
            value: value.trim().to_string(),
            line: line_number,
        };
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.to_string(), raw);
        last_key = Some(key.to_string());
    }

    Ok(sections)
}

/// Split a section header into `(group, name)`
///
/// A header without `:` belongs to the `global` group.
pub fn split_header(header: &str) -> (&str, &str) {
    match header.split_once(':') {
        Some((group, name)) => (group.trim(), name.trim()),
        None => (crate::GLOBAL, header),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values<'a>(sections: &'a RawSections, header: &str) -> Vec<(&'a str, &'a str)> {
        sections[header]
            .iter()
            .map(|(key, raw)| (key.as_str(), raw.value.as_str()))
            .collect()
    }

    #[test]
    fn sections_and_values() {
        let text = "\
# comment
[global]
foo = bar

; other comment
[instance:web]
<= base
ip=10.0.0.1
";
        let sections = parse(text, None).unwrap();

        assert_eq!(
            sections.keys().collect::<Vec<_>>(),
            vec!["global", "instance:web"]
        );
        assert_eq!(values(&sections, "global"), vec![("foo", "bar")]);
        assert_eq!(
            values(&sections, "instance:web"),
            vec![("<", "base"), ("ip", "10.0.0.1")]
        );
        assert_eq!(sections["instance:web"]["ip"].line, 8);
    }

    #[test]
    fn continuation_lines() {
        let text = "\
[global]
massagers =
    *:port = macroconf.IntegerMassager
    :debug = macroconf.BooleanMassager
after = 1
";
        let sections = parse(text, None).unwrap();

        assert_eq!(
            sections["global"]["massagers"].value,
            "*:port = macroconf.IntegerMassager\n:debug = macroconf.BooleanMassager"
        );
        assert_eq!(sections["global"]["after"].value, "1");
    }

    #[test]
    fn later_definitions_win() {
        let sections = parse("[a]\nx = 1\n[b]\ny = 2\n[a]\nx = 3\n", None).unwrap();
        assert_eq!(values(&sections, "a"), vec![("x", "3")]);
        assert_eq!(sections["a"]["x"].line, 6);
    }

    #[test]
    fn errors_name_the_line() {
        let path = Path::new("/etc/app.conf");
        let err = parse("[a]\nnot a value\n", Some(path)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "/etc/app.conf:2: expected 'key = value', found 'not a value'"
        );

        assert!(parse("x = 1\n", None).is_err());
        assert!(parse("[a\n", None).is_err());
    }

    #[test]
    fn headers() {
        assert_eq!(split_header("foo"), ("global", "foo"));
        assert_eq!(split_header("instance:foo"), ("instance", "foo"));
        assert_eq!(split_header("global:global"), ("global", "global"));
    }
}
