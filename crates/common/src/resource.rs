use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read resource {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Base location every data resource (calibration, patterns, media) is
/// resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBase {
    root: PathBuf,
}

impl Default for ResourceBase {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceBase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a resource path. Absolute paths are returned unchanged.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root.join(relative)
        }
    }

    /// Read a resource fully into memory.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>, ResourceError> {
        let path = self.resolve(relative);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path)
            } else {
                ResourceError::Io { path, source }
            }
        })
    }

    pub fn read_to_string(&self, relative: impl AsRef<Path>) -> Result<String, ResourceError> {
        let path = self.resolve(relative);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path)
            } else {
                ResourceError::Io { path, source }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_paths() {
        let base = ResourceBase::new("/srv/ar");
        assert_eq!(
            base.resolve("data/patt.hiro"),
            PathBuf::from("/srv/ar/data/patt.hiro")
        );
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = ResourceBase::new("/srv/ar");
        assert_eq!(base.resolve("/tmp/x.dat"), PathBuf::from("/tmp/x.dat"));
    }

    #[test]
    fn read_missing_resource_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let base = ResourceBase::new(dir.path());
        let err = base.read("data/camera_para.dat").unwrap_err();
        assert!(matches!(err, ResourceError::NotFound(_)));
    }

    #[test]
    fn read_existing_resource() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let base = ResourceBase::new(dir.path());
        assert_eq!(base.read("a.txt").unwrap(), b"hello");
        assert_eq!(base.read_to_string("a.txt").unwrap(), "hello");
    }
}
