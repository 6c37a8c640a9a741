//! Per-submission scratch directories

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// Parent directory under which each submission gets its own workspace.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `<root>/submission-<id>-XXXX`, unique even if the id repeats.
    pub fn allocate(&self, submission_id: Uuid) -> io::Result<ScratchDir> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("submission-{}-", submission_id))
            .tempdir_in(&self.root)?;

        tracing::debug!(path = %dir.path().display(), "Scratch directory allocated");
        Ok(ScratchDir { dir })
    }
}

/// Directory removed when dropped, whichever way the submission ends.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create (if needed) and return a subdirectory.
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Remove now and report failures instead of ignoring them on drop.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_unique_and_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(root.path().join("scratch"));
        let id = Uuid::new_v4();

        let first = space.allocate(id).unwrap();
        let second = space.allocate(id).unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&format!("submission-{}-", id)));

        let pages = first.subdir("pages-1").unwrap();
        std::fs::write(pages.join("page1.png"), b"x").unwrap();

        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!first_path.exists());

        let second_path = second.path().to_path_buf();
        second.close();
        assert!(!second_path.exists());
    }
}
