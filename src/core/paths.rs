//! Shared path manipulation utilities.

use std::env;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Resolve the parent directory for scoped directories.
///
/// `None` selects the platform temp root. The result is always absolute so
/// that `/tmp`, `/tmp/` and `/tmp/./` all identify the same retention key.
pub fn resolve_root(root: Option<&Path>) -> PathBuf {
    match root {
        Some(path) => resolve_absolute_path(path),
        None => resolve_absolute_path(&env::temp_dir()),
    }
}

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist yet), the path is made absolute
/// relative to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = make_absolute(path);

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Parent directory to create scoped directories in.
///
/// Absolute and syntactically normalized like [`resolve_root`], but symlinks
/// are left in place so created directories sit directly under the root the
/// caller named.
pub fn working_root(root: Option<&Path>) -> PathBuf {
    match root {
        Some(path) => normalize_syntactic(&make_absolute(path)),
        None => normalize_syntactic(&make_absolute(&env::temp_dir())),
    }
}

fn make_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    }
}

/// Whether a directory entry name follows the `<prefix>…<suffix>` pattern.
///
/// Names that are not valid UTF-8 never match.
pub fn name_matches(name: &OsStr, prefix: &str, suffix: &str) -> bool {
    name.to_str()
        .is_some_and(|name| name.starts_with(prefix) && name.ends_with(suffix))
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root_is_canonical_temp_dir() {
        let expected = std::fs::canonicalize(env::temp_dir()).unwrap();
        assert_eq!(resolve_root(None), expected);
    }

    #[test]
    fn trailing_slash_and_dot_resolve_to_same_root() {
        let dir = tempfile::tempdir().unwrap();
        let plain = resolve_root(Some(dir.path()));
        let dotted = resolve_root(Some(&dir.path().join(".")));
        let mut slashed = dir.path().as_os_str().to_owned();
        slashed.push("/");
        assert_eq!(plain, dotted);
        assert_eq!(plain, resolve_root(Some(Path::new(&slashed))));
    }

    #[test]
    fn relative_root_becomes_absolute() {
        let resolved = resolve_absolute_path(Path::new("no-such-dir-for-tdr"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("no-such-dir-for-tdr"));
    }

    #[test]
    fn normalizes_nonexistent_path_syntactically() {
        #[cfg(unix)]
        let root = Path::new("/");
        #[cfg(windows)]
        let root = Path::new("C:");

        let input = root.join("nonexistent").join("foo").join("..").join("bar");
        let expected = root.join("nonexistent").join("bar");
        assert!(std::fs::canonicalize(&input).is_err());

        assert_eq!(resolve_absolute_path(&input), expected);
    }

    #[cfg(unix)]
    #[test]
    fn working_root_keeps_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(working_root(Some(&link)), link);
        assert_eq!(working_root(Some(&link.join("."))), link);
        assert_eq!(
            resolve_root(Some(&link)),
            std::fs::canonicalize(&real).unwrap()
        );
    }

    #[test]
    fn name_matching_requires_both_ends() {
        let m = |n: &str| name_matches(OsStr::new(n), "tmp", "TempDirCont");
        assert!(m("tmpa1b2c3TempDirCont"));
        assert!(m("tmpTempDirCont"));
        assert!(!m("xtmpa1TempDirCont"));
        assert!(!m("tmpa1TempDirContx"));
        assert!(!m("tmpa1"));
    }

    #[test]
    fn empty_affixes_match_everything() {
        assert!(name_matches(OsStr::new("anything"), "", ""));
    }
}
