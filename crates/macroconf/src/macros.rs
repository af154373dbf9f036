//! macro expansion
//!
//! A section can inherit keys from other sections by listing them in the `<` key:
//!
//! ```text
//! [instance:base]
//! image = debian
//!
//! [instance:web]
//! <= base volume:data
//! ```
//!
//! References without a group refer to the group of the section using them. Referenced sections are
//! expanded first. Keys the section sets itself always win over inherited ones. If the group of the
//! using section has a macro cleaner, it is applied to a copy of each macro section before merging.
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::section::Section;
use indexmap::IndexMap;

/// Key listing the macros of a section
pub const MACRO_KEY: &str = "<";

/// group -> name -> section
pub type Groups = IndexMap<String, IndexMap<String, Section>>;

/// Expand the macros of every section in place
pub fn expand_all(groups: &mut Groups, registry: &Registry) -> Result<()> {
    let coordinates: Vec<(String, String)> = groups
        .iter()
        .flat_map(|(group, sections)| sections.keys().map(|name| (group.clone(), name.clone())))
        .collect();

    for (group, name) in coordinates {
        let mut active = vec![];
        expand(groups, registry, &group, &name, &mut active)?;
    }

    Ok(())
}

/// `active` holds the sections currently being expanded, reaching one of them again is a cycle
#[tracing::instrument(level = "trace", skip(groups, registry, active))]
fn expand(
    groups: &mut Groups,
    registry: &Registry,
    group: &str,
    name: &str,
    active: &mut Vec<(String, String)>,
) -> Result<()> {
    let Some(references) = groups
        .get(group)
        .and_then(|sections| sections.get(name))
        .and_then(|section| section.get_str(MACRO_KEY))
        .map(str::to_string)
    else {
        return Ok(());
    };

    active.push((group.to_string(), name.to_string()));

    for reference in references.split_whitespace() {
        let (macro_group, macro_name) = reference.split_once(':').unwrap_or((group, reference));

        if active
            .iter()
            .any(|(g, n)| g == macro_group && n == macro_name)
        {
            let mut chain: Vec<String> = active.iter().map(|(g, n)| format!("{g}:{n}")).collect();
            chain.push(format!("{macro_group}:{macro_name}"));
            return Err(Error::CircularMacroExpansion { chain });
        }

        expand(groups, registry, macro_group, macro_name, active)?;

        let mut macro_section = groups
            .get(macro_group)
            .and_then(|sections| sections.get(macro_name))
            .cloned()
            .ok_or_else(|| Error::MacroNotFound {
                section: format!("{group}:{name}"),
                reference: reference.to_string(),
            })?;

        if let Some(cleaner) = registry.macro_cleaner(group) {
            cleaner(&mut macro_section);
        }

        tracing::debug!(section = %format!("{group}:{name}"), reference, "expanding macro");
        if let Some(section) = groups.get_mut(group).and_then(|s| s.get_mut(name)) {
            for (key, item) in macro_section.iter() {
                if key == MACRO_KEY || section.contains_key(key) {
                    continue;
                }
                section.set(key, item.clone());
            }
        }
    }

    if let Some(section) = groups.get_mut(group).and_then(|s| s.get_mut(name)) {
        section.remove(MACRO_KEY);
    }
    active.pop();

    Ok(())
}
