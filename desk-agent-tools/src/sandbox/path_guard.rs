use crate::os_capabilities::{OsError, OsResult};
use std::path::{Component, Path, PathBuf};

/// Deny-list guard over filesystem paths.
///
/// Paths are absolutized against the current directory and lexically
/// normalized. Forbidden prefixes match case-insensitively, with `\` and `/`
/// treated alike, on whole components only (`/sys` does not cover `/system32`).
#[derive(Debug, Clone)]
pub struct PathGuard {
    forbidden: Vec<Vec<String>>,
}

impl PathGuard {
    pub fn new<I, S>(forbidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let forbidden = forbidden
            .into_iter()
            .map(|prefix| split_components(prefix.as_ref()))
            .filter(|components| !components.is_empty())
            .collect();
        Self { forbidden }
    }

    /// Returns the normalized absolute path, or `PermissionDenied`.
    pub fn check(&self, path: impl AsRef<Path>) -> OsResult<PathBuf> {
        let absolute = absolutize(path.as_ref())?;
        if self.is_forbidden(&absolute) {
            return Err(OsError::PermissionDenied(format!(
                "access to {} is forbidden",
                absolute.display()
            )));
        }
        Ok(absolute)
    }

    pub fn is_forbidden(&self, path: &Path) -> bool {
        let candidate = split_components(&path.to_string_lossy());
        self.forbidden
            .iter()
            .any(|prefix| candidate.len() >= prefix.len() && candidate[..prefix.len()] == prefix[..])
    }
}

fn split_components(raw: &str) -> Vec<String> {
    raw.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_lowercase)
        .collect()
}

/// Join onto the current directory and fold `.`/`..` without touching disk.
pub fn absolutize(path: &Path) -> OsResult<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}
