//! # macroconf - hierarchical configuration with macros
//!
//! ## Introduction for developers
//!
//! Read this to understand how `macroconf` works internally.
//!
//! ### File format
//!
//! Configuration files are made of sections, each belonging to a section group:
//!
//! ```text
//! # comments start with '#' or ';'
//! [global]
//! extends = ../base.conf
//! massagers =
//!     *:port = macroconf.IntegerMassager
//!     instance:debug = macroconf.BooleanMassager
//!
//! [instance:base]
//! image = debian
//! port = 22
//!
//! [instance:web]
//! <= base
//! ip = 10.0.0.2
//! ```
//!
//! A header without a group (`[global]`) belongs to the [GLOBAL] group.
//!
//! ### Loading files
//!
//! see [sources::load]
//!
//! The root source may extend other files (`extends` in `global:global`), which may extend others
//! in turn. Files are applied weakest first, so every file overrides the files it extends. Every
//! value remembers the file and line it came from ([section::Origin]) and the directory of that
//! file, which is used to resolve relative paths later on.
//!
//! ### Parsing
//!
//! see [Store::parse]
//!
//! - sections are filled from all loaded files
//! - `massagers` values are turned into [Massager]s, either registered on a single section or
//!   globally in the [Registry]
//! - macros (`<` key) are expanded in place, see [macros]
//!
//! ### Reading
//!
//! Nothing is converted at parse time. Each read of a key looks for a massager, most specific
//! first:
//!
//! | **registered on** | **bound to**   |
//! |-------------------|----------------|
//! | the section       | `(group, key)` |
//! | the registry      | `(group, key)` |
//! | the registry      | `(*, key)`     |
//!
//! Without a massager the raw string is returned. Conversion errors surface on the read that hits
//! them, keys that are never read never fail.
//!
//! ### Overrides
//!
//! [Store::effective] creates a throwaway copy of a section with overrides applied. The store
//! itself is never changed.
//!
//! ### Proxies
//!
//! A [proxy::ProxySection] aliases another section: reads fall back to it, writes go to both.
//! Sections handed out by [Store::section] are the store's own, so a proxy bound to one changes
//! what the store reads.
//!
//! ### Plugins
//!
//! Applications extend the engine through the [Plugin] trait: named massager and hook constructors,
//! globally registered massagers and macro cleaners.
pub mod error;
pub mod hooks;
pub mod ini;
pub mod macros;
pub mod massager;
pub mod proxy;
pub mod registry;
pub mod section;
pub mod sources;
pub mod store;
mod util;
pub mod value;

pub use error::{Error, Result};
pub use hooks::{Hook, Hooks};
pub use massager::{CustomMassager, MassageContext, Massager, MassagerKind};
pub use registry::{Plugin, Registry};
pub use section::{ConfigValue, Item, Origin, Section};
pub use sources::Source;
pub use store::{Effective, Store};
pub use value::Value;

/// Group of sections declared without a group, also holds `global:global`
pub const GLOBAL: &str = "global";
