//! Services module - stateless helpers the mod list is built on.
//!
//! # Components
//!
//! - [`FolderNameCodec`]: pure mapping between a folder name and its disabled form.
//!   Markers come from configuration rather than constants, so a different naming scheme
//!   only needs a config change plus a migration of existing folders.
//! - [`ModDeleter`]: the deletion capability the mod list delegates to. [`FsDeleter`] is
//!   the filesystem implementation with a directory-based recycle bin.
//!
//! Neither component keeps mutable state or knows about watchers, which keeps them usable
//! from tests and tools without a running mod list.

pub mod codec;
pub mod deletion;

pub use codec::FolderNameCodec;
pub use deletion::{FsDeleter, ModDeleter};
