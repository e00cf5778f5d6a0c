//! Where documents come from.
//!
//! Flattening never touches the filesystem directly; it asks a
//! `DocumentSource`. The CLI uses `FsSource`, tests use `MapSource`.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait DocumentSource {
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Identity of the document at `path`, used to spot reference cycles.
    /// Two paths naming the same document must map to the same value.
    fn canonical(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl DocumentSource for FsSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    /// Resolves symlinks; paths that do not exist fall back to lexical form.
    fn canonical(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| normalize_path(path))
    }
}

/// In-memory documents keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    files: HashMap<PathBuf, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), text.into());
    }

    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl DocumentSource for MapSource {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such document"))
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` at the start of a relative path is kept; `..` directly under the
/// root is dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize_path(Path::new("/../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_map_source_lookup_is_normalized() {
        let src = MapSource::new().with("dir/a.recb", "x");
        assert_eq!(src.read(Path::new("dir/sub/../a.recb")).unwrap(), "x");
        assert!(src.read(Path::new("dir/b.recb")).is_err());
    }
}
