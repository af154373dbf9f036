//! configuration sources and the `extends` chain
//!
//! A [Source] is either a file or in-memory text. Loading a source also loads every file it
//! extends (`extends` in the `global:global` section, whitespace separated, relative to the
//! declaring file).
//!
//! [load] returns the files weakest first: parents come before the file that extends them, so
//! applying them in order lets the most specific file win for every key it defines.
use crate::error::{Error, Result};
use crate::ini::{self, RawSections};
use crate::util;
use std::path::{Path, PathBuf};

/// Key in `global:global` listing the files a source extends
pub const EXTENDS_KEY: &str = "extends";

#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    /// In-memory text, relative paths resolve against `base_dir`
    Text { text: String, base_dir: PathBuf },
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn text(text: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Source::Text {
            text: text.into(),
            base_dir: base_dir.into(),
        }
    }
}

impl From<PathBuf> for Source {
    fn from(value: PathBuf) -> Self {
        Source::File(value)
    }
}

impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Source::File(value.to_path_buf())
    }
}

/// One parsed source
#[derive(Debug)]
pub struct SourceFile {
    /// Canonical path, `None` for in-memory text
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
    pub sections: RawSections,
}

impl SourceFile {
    /// Files listed in `extends`, resolved against [Self::base_dir]
    pub fn extends(&self) -> Vec<PathBuf> {
        let declared = self
            .sections
            .iter()
            .filter(|(header, _)| ini::split_header(header) == (crate::GLOBAL, crate::GLOBAL))
            .filter_map(|(_, keys)| keys.get(EXTENDS_KEY))
            .last();

        let Some(declared) = declared else {
            return vec![];
        };

        declared
            .value
            .split_whitespace()
            .map(|path| util::normalize(&self.base_dir.join(util::expand_home(path))))
            .collect()
    }
}

/// Load `source` and everything it extends, weakest first
pub fn load(source: Source) -> Result<Vec<SourceFile>> {
    let mut loaded = vec![];
    let mut chain = vec![];

    match source {
        Source::File(path) => load_file(&path, &mut chain, &mut loaded)?,
        Source::Text { text, base_dir } => {
            tracing::info!(base_dir=%base_dir.display(), "loading text");
            let file = SourceFile {
                path: None,
                sections: ini::parse(&text, None)?,
                base_dir,
            };

            load_extends(&file, &mut chain, &mut loaded)?;
            loaded.push(file);
        }
    }

    Ok(loaded)
}

/// `chain` holds the files currently being loaded, seeing one of them again is a cycle
fn load_file(path: &Path, chain: &mut Vec<PathBuf>, loaded: &mut Vec<SourceFile>) -> Result<()> {
    if !path.exists() {
        return Err(Error::MissingConfigFile(path.to_path_buf()));
    }

    let path = path.canonicalize().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if chain.contains(&path) {
        return Err(Error::CircularExtends(path));
    }

    tracing::info!(path=%path.display(), "loading file");
    let contents = std::fs::read_to_string(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;

    let file = SourceFile {
        sections: ini::parse(&contents, Some(&path))?,
        base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        path: Some(path.clone()),
    };

    chain.push(path);
    load_extends(&file, chain, loaded)?;
    chain.pop();

    loaded.push(file);
    Ok(())
}

fn load_extends(
    file: &SourceFile,
    chain: &mut Vec<PathBuf>,
    loaded: &mut Vec<SourceFile>,
) -> Result<()> {
    for parent in file.extends() {
        tracing::debug!(parent=%parent.display(), "following extends");
        load_file(&parent, chain, loaded)?;
    }

    Ok(())
}
