//! Project persistence.
//!
//! Rendering never touches storage; the CLI uses a [`ProjectStore`] to load
//! a project by id and to save it back after a status change.

use std::path::{Path, PathBuf};

use crate::error::{FolioError, Result};
use crate::model::Project;

/// Load and save project JSON by id.
pub trait ProjectStore {
    fn load(&self, id: &str) -> Result<Project>;
    fn save(&self, project: &Project) -> Result<()>;
}

/// Stores each project as `<id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    dir: PathBuf,
}

impl FsProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(FolioError::Store(format!("invalid project id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

impl ProjectStore for FsProjectStore {
    fn load(&self, id: &str) -> Result<Project> {
        let path = self.path_for(id)?;
        let json = std::fs::read_to_string(&path).map_err(|e| {
            FolioError::Store(format!("cannot read project '{}' from {}: {}", id, path.display(), e))
        })?;
        Project::from_json(&json)
    }

    fn save(&self, project: &Project) -> Result<()> {
        let path = self.path_for(&project.id)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, project.to_json()?)?;
        log::debug!("saved project '{}' to {}", project.id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::catalog::LayoutCatalog;
    use crate::model::preset::find_preset;
    use crate::model::ProjectStatus;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsProjectStore::new(dir.path().join("projects"));
        let preset = find_preset("square-20").unwrap();
        let mut project = Project::from_preset(preset, 2, Some("u-1".into()), &LayoutCatalog::builtin());
        project.transition(ProjectStatus::Completed).unwrap();
        store.save(&project).unwrap();

        let loaded = store.load(&project.id).unwrap();
        assert_eq!(loaded.pages.len(), 4);
        assert_eq!(loaded.status, ProjectStatus::Completed);
        assert_eq!(loaded.owner_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_missing_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsProjectStore::new(dir.path());
        assert!(matches!(store.load("nope"), Err(FolioError::Store(_))));
        assert!(matches!(store.load("../etc/passwd"), Err(FolioError::Store(_))));
        assert!(matches!(store.load(""), Err(FolioError::Store(_))));
    }
}
