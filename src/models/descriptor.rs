use crate::error::{ModListError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Identity and metadata of one mod folder
///
/// The path is the source of truth for the folder's current on-disk name. Two descriptors
/// denote the same mod folder when their paths are equal; the custom name is metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDescriptor {
    path: Utf8PathBuf,
    custom_name: Option<String>,
}

impl ModDescriptor {
    /// Create a descriptor for the folder at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ModListError::InvalidFolderName`] if the path has no final folder name
    /// (for example `/` or a path ending in `..`).
    pub fn new(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        Self::with_custom_name(path, None)
    }

    pub fn with_custom_name(
        path: impl Into<Utf8PathBuf>,
        custom_name: Option<String>,
    ) -> Result<Self> {
        let path = path.into();
        match path.file_name() {
            Some(name) if !name.is_empty() => {}
            _ => return Err(ModListError::InvalidFolderName(path.to_string())),
        }

        Ok(Self {
            path,
            custom_name: custom_name.filter(|name| !name.is_empty()),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Final path component, possibly carrying a disabled marker
    pub fn folder_name(&self) -> &str {
        // Non-empty by construction
        self.path.file_name().unwrap_or_default()
    }

    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    /// Custom name if one is set, otherwise the folder name
    pub fn display_name(&self) -> &str {
        self.custom_name().unwrap_or_else(|| self.folder_name())
    }

    /// Set the custom name; an empty name clears it
    pub fn set_custom_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.custom_name = if name.is_empty() { None } else { Some(name) };
    }

    /// Same mod at a new path, keeping the custom name
    pub fn renamed_to(&self, path: impl Into<Utf8PathBuf>) -> Result<Self> {
        Self::with_custom_name(path, self.custom_name.clone())
    }
}
