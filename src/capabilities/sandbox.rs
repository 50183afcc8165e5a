//! Confines file tools to one directory subtree.
//!
//! Requested paths are resolved against the sandbox root. `..` components,
//! absolute paths elsewhere, and symlinks pointing outside the root are all
//! rejected. The filesystem itself stays a shared resource: two tool calls
//! touching the same path are not serialized against each other.

use crate::mcp::tools::ToolCallError;
use std::io;
use std::path::{Component, Path, PathBuf};

fn escape(requested: &str) -> ToolCallError {
    ToolCallError::new(format!("Path escapes the sandbox: {requested}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Creates a sandbox rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Sandbox { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a caller-supplied path to a location inside the sandbox,
    /// following symlinks all the way to the final component.
    ///
    /// The returned path need not exist yet.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolCallError> {
        let normalized = self.normalize_checked(requested)?;
        self.canonical_within(&normalized, requested)
    }

    /// Like [`Sandbox::resolve`], but leaves the final component alone, so a
    /// symlink names the link itself rather than its target.
    pub fn resolve_entry(&self, requested: &str) -> Result<PathBuf, ToolCallError> {
        let normalized = self.normalize_checked(requested)?;
        if normalized == self.root {
            return Ok(self.root.clone());
        }
        let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name()) else {
            return Err(escape(requested));
        };
        let mut resolved = self.canonical_within(parent, requested)?;
        resolved.push(name);
        Ok(resolved)
    }

    fn normalize_checked(&self, requested: &str) -> Result<PathBuf, ToolCallError> {
        if requested.is_empty() {
            return Err(ToolCallError::new("Path must not be empty"));
        }
        self.normalize(Path::new(requested))
            .ok_or_else(|| escape(requested))
    }

    /// Canonicalizes the deepest existing ancestor of `path` and re-appends
    /// the missing tail, failing if symlinks lead outside the root.
    fn canonical_within(&self, path: &Path, requested: &str) -> Result<PathBuf, ToolCallError> {
        let mut existing = path;
        let mut missing = Vec::new();
        while std::fs::symlink_metadata(existing).is_err() {
            let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                return Err(escape(requested));
            };
            missing.push(name.to_os_string());
            existing = parent;
        }
        let mut resolved = existing.canonicalize().map_err(|e| {
            ToolCallError::new(format!("Cannot resolve path: {requested}")).with_detail(format!("{e:?}"))
        })?;
        if !resolved.starts_with(&self.root) {
            return Err(escape(requested));
        }
        for name in missing.iter().rev() {
            resolved.push(name);
        }
        Ok(resolved)
    }

    /// Path relative to the root, for messages.
    pub fn display(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    fn normalize(&self, requested: &Path) -> Option<PathBuf> {
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    if !normalized.pop() {
                        return None;
                    }
                }
                Component::CurDir => {}
                other => normalized.push(other.as_os_str()),
            }
        }
        normalized.starts_with(&self.root).then_some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_land_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let path = sandbox.resolve("notes/today.txt").unwrap();
        assert!(path.starts_with(sandbox.root()));
        assert_eq!(sandbox.display(&path), Path::new("notes").join("today.txt").display().to_string());
    }

    #[test]
    fn parent_components_cannot_escape() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let err = sandbox.resolve("../outside.txt").unwrap_err();
        assert!(err.message().contains("escapes the sandbox"));
        assert!(sandbox.resolve("a/../../b").is_err());
        assert!(sandbox.resolve("a/../b").is_ok());
    }

    #[test]
    fn absolute_paths_outside_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let outside = other.path().join("x.txt");
        assert!(sandbox.resolve(&outside.display().to_string()).is_err());
        let inside = sandbox.root().join("y.txt");
        assert!(sandbox.resolve(&inside.display().to_string()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_pointing_outside_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(other.path(), dir.path().join("link")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        assert!(sandbox.resolve("link/secret.txt").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn entries_keep_the_link_itself() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink("real.txt", dir.path().join("alias")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        assert_eq!(sandbox.resolve_entry("alias").unwrap(), sandbox.root().join("alias"));
        assert_eq!(sandbox.resolve("alias").unwrap(), sandbox.root().join("real.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn entry_parents_must_stay_inside() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(other.path(), dir.path().join("link")).unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        assert!(sandbox.resolve_entry("link/file.txt").is_err());
        assert!(sandbox.resolve_entry("../x").is_err());
        assert_eq!(sandbox.resolve_entry(".").unwrap(), sandbox.root());
    }

    #[test]
    fn root_displays_as_dot() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        let root = sandbox.resolve(".").unwrap();
        assert_eq!(sandbox.display(&root), ".");
    }
}
