//! error taxonomy
//!
//! Structural errors (everything detected while parsing) abort [crate::Store::parse]. Coercion
//! errors are only raised when the affected key is read.
use crate::section::Origin;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Config file '{}' doesn't exist", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("Circular config file extension on '{}'", .0.display())]
    CircularExtends(PathBuf),

    #[error("Unable to read config file '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: {message}")]
    Syntax { origin: Origin, message: String },

    #[error("Circular macro expansion: {}", .chain.join(" -> "))]
    CircularMacroExpansion { chain: Vec<String> },

    #[error("Macro '{reference}' used in section '{section}' not found")]
    MacroNotFound { section: String, reference: String },

    #[error("Invalid massager spec '{declaration}' in section '{section}': {reason}")]
    InvalidMassagerDeclaration {
        section: String,
        declaration: String,
        reason: &'static str,
    },

    #[error("Unable to resolve massager '{name}': {cause}")]
    MassagerResolution { name: String, cause: String },

    #[error("Unable to resolve hook '{name}': {cause}")]
    HookResolution { name: String, cause: String },

    #[error(
        "Massager for '{group}:{key}' is already registered as '{existing}', refusing '{new}'"
    )]
    ConflictingMassager {
        group: String,
        key: String,
        existing: String,
        new: String,
    },

    #[error("Invalid {expected} value {value:?} for key '{key}'{}", origin_suffix(.origin))]
    TypeCoercion {
        key: String,
        value: String,
        expected: &'static str,
        origin: Option<Origin>,
    },

    #[error("Unable to determine the current user name for key '{key}'")]
    UnknownUser { key: String },

    #[error("Section '{group}:{name}' not found")]
    SectionNotFound { group: String, name: String },

    #[error("The to be proxied target '{target}' for '{owner}' wasn't found")]
    ProxyTargetNotFound { target: String, owner: String },
}

fn origin_suffix(origin: &Option<Origin>) -> String {
    match origin {
        Some(origin) => format!(" (set at {origin})"),
        None => String::new(),
    }
}
