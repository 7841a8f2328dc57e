use std::{
    io,
    path::{Path, PathBuf},
};

/// Provides shader text for a path.
///
/// Implementations must return the complete contents of the file, or an error when the path does not
/// exist or cannot be read. Partial reads are only allowed at the true end of the file.
pub trait SourceLoader {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

impl<L: ?Sized + SourceLoader> SourceLoader for &L {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        (**self).read_source(path)
    }
}

impl<L: ?Sized + SourceLoader> SourceLoader for Box<L> {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        (**self).read_source(path)
    }
}

/// Reads shader sources from the filesystem, optionally relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    base_path: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceLoader for FsLoader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        let path = self.resolve(path);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::debug!(path=%path.display(), bytes=contents.len(), "Read shader source");
                Ok(contents)
            }
            Err(err) => {
                tracing::warn!(path=%path.display(), "Cannot read shader source: {}", err);
                Err(err)
            }
        }
    }
}
