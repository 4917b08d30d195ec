//! Folder-state codec: maps mod folder names to and from their disabled form.
//!
//! A folder is disabled when its name starts with the primary marker or the legacy
//! marker, compared case-insensitively. The legacy marker exists for installations
//! created by older releases, which wrote `DISABLEDname` without a separator. Both
//! markers are persisted on disk and visible to users, so changing them needs a
//! migration for existing folders.
//!
//! Note that the legacy marker has no delimiter: a folder literally named `DISABLEDCarol`
//! is treated as the disabled form of `Carol`.
//!
//! # Examples
//!
//! ```
//! use modlist::services::FolderNameCodec;
//!
//! let codec = FolderNameCodec::default();
//! assert_eq!(codec.apply_disabled_marker("Alice"), "DISABLED_Alice");
//! assert_eq!(codec.apply_disabled_marker("DISABLEDAlice"), "DISABLED_Alice");
//! assert_eq!(codec.strip_disabled_marker("disabled_Alice"), "Alice");
//! assert!(!codec.is_disabled_name("Alice"));
//! ```

use crate::error::{ModListError, Result};
use crate::models::MarkerConfig;

/// Primary disabled marker written by this crate
pub const DEFAULT_PRIMARY_MARKER: &str = "DISABLED_";

/// Legacy disabled marker still recognized when reading folder names
pub const DEFAULT_LEGACY_MARKER: &str = "DISABLED";

/// Pure folder-name transforms parameterized by the configured markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNameCodec {
    primary: String,
    legacy: String,
}

impl FolderNameCodec {
    /// Create a codec from explicit markers.
    ///
    /// # Errors
    ///
    /// Returns [`ModListError::InvalidMarkers`] if a marker is empty or contains a path
    /// separator.
    pub fn new(primary: impl Into<String>, legacy: impl Into<String>) -> Result<Self> {
        let primary = primary.into();
        let legacy = legacy.into();

        for (label, marker) in [("primary", &primary), ("legacy", &legacy)] {
            if marker.is_empty() {
                return Err(ModListError::InvalidMarkers(format!(
                    "{label} marker must not be empty"
                )));
            }
            if marker.contains(['/', '\\']) {
                return Err(ModListError::InvalidMarkers(format!(
                    "{label} marker {marker:?} contains a path separator"
                )));
            }
        }

        Ok(Self { primary, legacy })
    }

    /// Create a codec from the marker section of the configuration
    pub fn from_config(markers: &MarkerConfig) -> Result<Self> {
        Self::new(markers.primary.clone(), markers.legacy.clone())
    }

    pub fn primary_marker(&self) -> &str {
        &self.primary
    }

    pub fn legacy_marker(&self) -> &str {
        &self.legacy
    }

    /// True if `name` starts with either marker
    pub fn is_disabled_name(&self, name: &str) -> bool {
        self.leading_marker_len(name).is_some()
    }

    /// Remove every leading disabled marker from `name`.
    ///
    /// Only leading text is removed; a marker appearing later in the name is kept.
    pub fn strip_disabled_marker<'a>(&self, name: &'a str) -> &'a str {
        let mut rest = name;
        while let Some(len) = self.leading_marker_len(rest) {
            rest = &rest[len..];
        }
        rest
    }

    /// Return the disabled form of `name`, normalizing the legacy marker to the primary one
    pub fn apply_disabled_marker(&self, name: &str) -> String {
        if prefix_len_ignore_case(name, &self.primary).is_some() {
            return name.to_string();
        }

        match prefix_len_ignore_case(name, &self.legacy) {
            Some(len) => format!("{}{}", self.primary, &name[len..]),
            None => format!("{}{}", self.primary, name),
        }
    }

    /// Byte length of the marker `name` starts with, primary marker first
    fn leading_marker_len(&self, name: &str) -> Option<usize> {
        prefix_len_ignore_case(name, &self.primary)
            .or_else(|| prefix_len_ignore_case(name, &self.legacy))
    }
}

impl Default for FolderNameCodec {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_MARKER.to_string(),
            legacy: DEFAULT_LEGACY_MARKER.to_string(),
        }
    }
}

/// Case-insensitive prefix match returning the matched byte length within `name`
fn prefix_len_ignore_case(name: &str, marker: &str) -> Option<usize> {
    let mut chars = name.char_indices();
    for expected in marker.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(name.len(), |(index, _)| index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_prepends_primary_marker() {
        let codec = FolderNameCodec::default();
        assert_eq!(codec.apply_disabled_marker("Alice"), "DISABLED_Alice");
    }

    #[test]
    fn test_apply_keeps_existing_primary_marker() {
        let codec = FolderNameCodec::default();
        assert_eq!(codec.apply_disabled_marker("DISABLED_Alice"), "DISABLED_Alice");
        assert_eq!(codec.apply_disabled_marker("disabled_Alice"), "disabled_Alice");
    }

    #[test]
    fn test_apply_normalizes_legacy_marker() {
        let codec = FolderNameCodec::default();
        assert_eq!(codec.apply_disabled_marker("DISABLEDCarol"), "DISABLED_Carol");
        assert_eq!(codec.apply_disabled_marker("disabledCarol"), "DISABLED_Carol");
    }

    #[test]
    fn test_strip_removes_only_leading_marker_text() {
        let codec = FolderNameCodec::default();
        assert_eq!(codec.strip_disabled_marker("DISABLED_Bob"), "Bob");
        assert_eq!(codec.strip_disabled_marker("DISABLEDBob"), "Bob");
        assert_eq!(
            codec.strip_disabled_marker("Bob DISABLED_ edition"),
            "Bob DISABLED_ edition"
        );
        assert_eq!(codec.strip_disabled_marker("Bob"), "Bob");
    }

    #[test]
    fn test_strip_repeated_markers() {
        let codec = FolderNameCodec::default();
        assert_eq!(codec.strip_disabled_marker("DISABLED_DISABLED_Bob"), "Bob");
        assert_eq!(codec.strip_disabled_marker("DISABLED_"), "");
    }

    #[test]
    fn test_is_disabled_name() {
        let codec = FolderNameCodec::default();
        assert!(codec.is_disabled_name("DISABLED_Alice"));
        assert!(codec.is_disabled_name("Disabled_Alice"));
        assert!(codec.is_disabled_name("DISABLEDCarol"));
        assert!(!codec.is_disabled_name("Alice"));
        assert!(!codec.is_disabled_name("DISABLE"));
        assert!(!codec.is_disabled_name(""));
    }

    #[test]
    fn test_custom_markers() {
        let codec = FolderNameCodec::new("OFF-", "OFF").unwrap();
        assert_eq!(codec.apply_disabled_marker("Alice"), "OFF-Alice");
        assert_eq!(codec.apply_disabled_marker("offAlice"), "OFF-Alice");
        assert_eq!(codec.strip_disabled_marker("OFF-Alice"), "Alice");
        assert!(!codec.is_disabled_name("DISABLED_Alice"));
    }

    #[test]
    fn test_rejects_invalid_markers() {
        assert!(matches!(
            FolderNameCodec::new("", "DISABLED"),
            Err(ModListError::InvalidMarkers(_))
        ));
        assert!(matches!(
            FolderNameCodec::new("DISABLED_", "a/b"),
            Err(ModListError::InvalidMarkers(_))
        ));
    }

    #[test]
    fn test_non_ascii_names_are_sliced_on_char_boundaries() {
        let codec = FolderNameCodec::new("ÄUS_", "ÄUS").unwrap();
        assert_eq!(codec.strip_disabled_marker("äus_Ünïcödé"), "Ünïcödé");
        assert_eq!(codec.apply_disabled_marker("äusÜ"), "ÄUS_Ü");
    }
}
