use std::path::{Component, Path, PathBuf};

/// Expand a leading `~` to the home directory
///
/// `~user` is left alone, as is everything when the home directory is unknown.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return PathBuf::from(path);
    };

    match home::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Resolve `.` and `..` without touching the filesystem
///
/// `..` above the root stays at the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => result.push(prefix.as_os_str()),
            Component::RootDir => result.push(component),
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(".."),
            },
        }
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }

    result
}

/// Expand home, make absolute against `base_dir` and normalize
pub(crate) fn resolve_path(value: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand_home(value);
    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&base_dir.join(expanded))
    }
}

/// Name of the user running this process
///
/// Resolved through the real uid where the platform has one, the environment is only consulted
/// when that fails.
pub(crate) fn current_user() -> Option<String> {
    user_from_uid().or_else(|| {
        ["USER", "LOGNAME", "USERNAME"]
            .into_iter()
            .find_map(|var| std::env::var(var).ok().filter(|name| !name.is_empty()))
    })
}

#[cfg(unix)]
fn user_from_uid() -> Option<String> {
    let uid = nix::unistd::getuid();
    match nix::unistd::User::from_uid(uid) {
        Ok(user) => user.map(|user| user.name),
        Err(err) => {
            tracing::debug!(%uid, error = %err, "user lookup failed");
            None
        }
    }
}

#[cfg(not(unix))]
fn user_from_uid() -> Option<String> {
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/../../c")), PathBuf::from("/c"));
        assert_eq!(normalize(Path::new("/a/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn resolve_relative() {
        assert_eq!(
            resolve_path("../scripts/init.sh", Path::new("/etc/app")),
            PathBuf::from("/etc/scripts/init.sh")
        );
        assert_eq!(
            resolve_path("/opt/init.sh", Path::new("/etc/app")),
            PathBuf::from("/opt/init.sh")
        );
    }

    #[cfg(unix)]
    #[test]
    fn user_follows_uid() {
        let Some(name) = user_from_uid() else {
            return;
        };

        assert_eq!(current_user(), Some(name));
    }

    #[test]
    fn resolve_home() {
        let Some(home) = home::home_dir() else {
            return;
        };

        assert_eq!(resolve_path("~/keys", Path::new("/etc")), home.join("keys"));
        assert_eq!(expand_home("~other/keys"), PathBuf::from("~other/keys"));
    }
}
