//! Disk access for the transform.

use camino::{Utf8Path, Utf8PathBuf};
use glint_transform::FileSystem;

/// Reads files relative to a workspace root.
///
/// Paths handed to the transform stay workspace-relative, so module and
/// diagnostic file names do too.
#[derive(Debug, Clone)]
pub struct OsFileSystem {
    root: Utf8PathBuf,
}

impl OsFileSystem {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for OsFileSystem {
    fn file_exists(&self, path: &Utf8Path) -> bool {
        self.resolve(path).is_file()
    }

    fn read_file(&self, path: &Utf8Path) -> Option<String> {
        std::fs::read_to_string(self.resolve(path)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_reads() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::write(root.join("app/a.hbs"), "{{@a}}").unwrap();

        let fs = OsFileSystem::new(root.clone());
        assert!(fs.file_exists(Utf8Path::new("app/a.hbs")));
        assert!(!fs.file_exists(Utf8Path::new("app")));
        assert_eq!(fs.read_file(Utf8Path::new("app/a.hbs")).as_deref(), Some("{{@a}}"));
        assert_eq!(fs.read_file(Utf8Path::new("app/b.hbs")), None);
    }
}
