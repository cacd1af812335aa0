//! Confinement of externally supplied names to a root directory.
//!
//! Every team name, agent name, archive filename and project id that reaches
//! the filesystem passes through [`resolve_within`]. Validation is purely
//! lexical, so a rejected name never causes a filesystem call.

use std::path::{Component, Path, PathBuf};

use crate::PathError;

/// Grammar a name is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// `[A-Za-z0-9_-]+`: team, agent, task and project identifiers.
    Identifier,
    /// `[A-Za-z0-9_.-]+`: a single file name such as an archive record.
    FileName,
}

impl NameKind {
    fn allows(self, c: char) -> bool {
        match self {
            NameKind::Identifier => c.is_ascii_alphanumeric() || c == '_' || c == '-',
            NameKind::FileName => c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'),
        }
    }
}

fn reject(value: &str, reason: &'static str) -> PathError {
    PathError::InvalidIdentifier {
        value: value.to_string(),
        reason,
    }
}

/// Check `name` against the grammar for `kind`.
pub fn validate_name(name: &str, kind: NameKind) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(reject(name, "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(reject(name, "must not contain a path separator"));
    }
    if name.contains("..") {
        return Err(reject(name, "must not contain '..'"));
    }
    if name.starts_with('.') {
        return Err(reject(name, "must not start with '.'"));
    }
    if !name.chars().all(|c| kind.allows(c)) {
        return Err(reject(name, "contains characters outside the allowed set"));
    }
    Ok(())
}

/// Join `name` onto `root`, guaranteeing the result stays inside `root`.
///
/// Validates first, then re-derives the basename and checks containment of
/// the joined path. Callers must not fall back to an unvalidated path on error.
pub fn resolve_within(root: &Path, name: &str, kind: NameKind) -> Result<PathBuf, PathError> {
    validate_name(name, kind)?;

    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| reject(name, "has no file name component"))?;
    if base != name {
        return Err(reject(name, "is not a single path component"));
    }

    let candidate = root.join(base);
    let relative = candidate
        .strip_prefix(root)
        .map_err(|_| PathError::OutsideRoot {
            path: candidate.display().to_string(),
        })?;

    let escapes = relative.as_os_str().is_empty()
        || relative.is_absolute()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(PathError::OutsideRoot {
            path: candidate.display().to_string(),
        });
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/srv/teams";

    #[test]
    fn test_accepts_identifier() {
        let path = resolve_within(Path::new(ROOT), "alpha_team-2", NameKind::Identifier).unwrap();
        assert_eq!(path, PathBuf::from("/srv/teams/alpha_team-2"));
    }

    #[test]
    fn test_accepts_file_name_with_dots() {
        let path = resolve_within(
            Path::new(ROOT),
            "alpha_2026-01-01T00-00-00.000Z.json",
            NameKind::FileName,
        )
        .unwrap();
        assert!(path.ends_with("alpha_2026-01-01T00-00-00.000Z.json"));
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        let bad = [
            "",
            "../etc",
            "..",
            "a/b",
            "a\\b",
            "/abs",
            ".hidden",
            "team name",
            "team\0",
            "tëam",
            "a..b",
        ];
        for name in bad {
            assert!(
                resolve_within(Path::new(ROOT), name, NameKind::Identifier).is_err(),
                "accepted {name:?}"
            );
            assert!(
                resolve_within(Path::new(ROOT), name, NameKind::FileName).is_err(),
                "accepted {name:?} as file name"
            );
        }
    }

    #[test]
    fn test_identifier_rejects_dot() {
        assert!(validate_name("config.json", NameKind::Identifier).is_err());
        assert!(validate_name("config.json", NameKind::FileName).is_ok());
    }

    #[test]
    fn test_error_carries_value() {
        let err = validate_name("../x", NameKind::Identifier).unwrap_err();
        assert!(err.to_string().contains("../x"));
    }

    #[test]
    fn test_no_filesystem_access_for_missing_root() {
        // Root need not exist: confinement is lexical.
        let path = resolve_within(Path::new("/does/not/exist"), "ok", NameKind::Identifier);
        assert!(path.is_ok());
    }
}
