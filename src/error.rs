use crate::models::ModState;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors reported by mod list operations
///
/// Membership, transition and collision errors are returned to the caller and never
/// leave a partially applied change behind. Watcher failures observed at runtime are
/// logged rather than returned; [`ModListError::Watcher`] only covers setting a watcher up.
#[derive(Error, Debug)]
pub enum ModListError {
    #[error("Mod folder {path} is already tracked")]
    AlreadyTracked { path: Utf8PathBuf },

    #[error("Mod {0} is not tracked")]
    NotTracked(String),

    #[error("Mod {name} is already {state}")]
    InvalidTransition { name: String, state: ModState },

    #[error("A folder named {name} already exists")]
    NameCollision { name: String },

    #[error("Invalid mod folder name: {0}")]
    InvalidFolderName(String),

    #[error("{path} is not a direct child of {root}")]
    OutsideRoot { path: Utf8PathBuf, root: Utf8PathBuf },

    #[error("Invalid disabled markers: {0}")]
    InvalidMarkers(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModListError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message_names_state() {
        let err = ModListError::InvalidTransition {
            name: "Alice".to_string(),
            state: ModState::Enabled,
        };
        assert_eq!(err.to_string(), "Mod Alice is already enabled");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = ModListError::io(
            "Failed to rename /mods/a",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("Failed to rename /mods/a"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
