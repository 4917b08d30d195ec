use crate::error::{ModListError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use uuid::Uuid;

/// Physically removes mod folders
///
/// Implementations must surface failures instead of swallowing them; the mod list keeps
/// an entry tracked when its deletion fails.
#[cfg_attr(test, mockall::automock)]
pub trait ModDeleter: Send + Sync {
    /// Remove the folder at `path`, either permanently or into a recycle location
    fn delete(&self, path: &Utf8Path, move_to_recycle_bin: bool) -> Result<()>;
}

/// Filesystem deleter with a directory-based recycle bin
///
/// Recycled folders are moved into `recycle_dir` under `<folder>-<uuid>`, so repeated
/// deletions of equally named folders never collide. The recycle directory must live on
/// the same filesystem as the mods folder, since recycling is a plain rename.
#[derive(Debug, Clone)]
pub struct FsDeleter {
    recycle_dir: Utf8PathBuf,
}

impl FsDeleter {
    pub fn new(recycle_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            recycle_dir: recycle_dir.into(),
        }
    }

    pub fn recycle_dir(&self) -> &Utf8Path {
        &self.recycle_dir
    }

    fn recycle(&self, path: &Utf8Path) -> Result<Utf8PathBuf> {
        fs::create_dir_all(&self.recycle_dir).map_err(|e| {
            ModListError::io(
                format!("Failed to create recycle directory {}", self.recycle_dir),
                e,
            )
        })?;

        let folder_name = path.file_name().unwrap_or("mod");
        let target = self
            .recycle_dir
            .join(format!("{}-{}", folder_name, Uuid::new_v4().simple()));

        fs::rename(path, &target).map_err(|e| {
            ModListError::io(format!("Failed to move {} to {}", path, target), e)
        })?;

        Ok(target)
    }
}

impl ModDeleter for FsDeleter {
    fn delete(&self, path: &Utf8Path, move_to_recycle_bin: bool) -> Result<()> {
        if !path.is_dir() {
            return Err(ModListError::io(
                format!("Cannot delete {}", path),
                std::io::Error::new(std::io::ErrorKind::NotFound, "mod folder does not exist"),
            ));
        }

        if move_to_recycle_bin {
            let target = self.recycle(path)?;
            tracing::debug!(path = %path, recycled_to = %target, "Moved mod folder to recycle bin");
        } else {
            fs::remove_dir_all(path)
                .map_err(|e| ModListError::io(format!("Failed to delete {}", path), e))?;
            tracing::debug!(path = %path, "Deleted mod folder");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_permanent_delete_removes_tree() {
        let (_temp_dir, root) = utf8_temp_dir();
        let mod_dir = root.join("mods").join("Alice");
        fs::create_dir_all(mod_dir.join("textures")).unwrap();
        fs::write(mod_dir.join("textures").join("a.dds"), b"dds").unwrap();

        let deleter = FsDeleter::new(root.join("trash"));
        deleter.delete(&mod_dir, false).unwrap();

        assert!(!mod_dir.exists());
        assert!(!root.join("trash").exists());
    }

    #[test]
    fn test_recycle_moves_into_recycle_dir() {
        let (_temp_dir, root) = utf8_temp_dir();
        let mod_dir = root.join("mods").join("Alice");
        fs::create_dir_all(&mod_dir).unwrap();
        fs::write(mod_dir.join("mod.ini"), b"[mod]").unwrap();

        let deleter = FsDeleter::new(root.join("trash"));
        deleter.delete(&mod_dir, true).unwrap();

        assert!(!mod_dir.exists());
        let recycled: Vec<_> = fs::read_dir(root.join("trash"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(recycled.len(), 1);
        assert!(recycled[0].starts_with("Alice-"));
    }

    #[test]
    fn test_delete_missing_folder_fails() {
        let (_temp_dir, root) = utf8_temp_dir();
        let deleter = FsDeleter::new(root.join("trash"));

        let result = deleter.delete(&root.join("missing"), true);
        assert!(matches!(result, Err(ModListError::Io { .. })));
    }
}
