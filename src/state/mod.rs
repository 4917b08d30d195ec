// Mod list state module
//
// ModList owns the tracked mod folders of one character, keeps them in sync with the
// watched directory and emits change events for every confirmed mutation.

use crate::error::{ModListError, Result};
use crate::metrics::Metrics;
use crate::models::{DeletionSettings, ModDescriptor, ModEntry, ModId, ModState, WatchSettings};
use crate::services::{FolderNameCodec, FsDeleter, ModDeleter};
use crate::watch::{EventSink, WatchAdapter, WatchEvent, WatchSource};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use suppression::Suppression;
use tokio::sync::broadcast;

pub mod registry;
mod suppression;

pub use registry::ModListRegistry;

/// Buffer of the broadcast channel returned by [`ModList::subscribe`]
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Kind of change a [`ModsChanged`] event reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Created,
    Deleted,
    Renamed,
}

/// Emitted after every confirmed change to a mod list's folders
///
/// Events caused by the watcher and by the list's own operations look the same. The old
/// path is present exactly when the change is a rename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModsChanged {
    change_type: ChangeType,
    new_path: Utf8PathBuf,
    old_path: Option<Utf8PathBuf>,
}

impl ModsChanged {
    pub fn created(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            change_type: ChangeType::Created,
            new_path: path.into(),
            old_path: None,
        }
    }

    pub fn deleted(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            change_type: ChangeType::Deleted,
            new_path: path.into(),
            old_path: None,
        }
    }

    pub fn renamed(new_path: impl Into<Utf8PathBuf>, old_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            change_type: ChangeType::Renamed,
            new_path: new_path.into(),
            old_path: Some(old_path.into()),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Path after the change; for deletions, the path that was removed
    pub fn new_path(&self) -> &Utf8Path {
        &self.new_path
    }

    pub fn old_path(&self) -> Option<&Utf8Path> {
        self.old_path.as_deref()
    }
}

impl fmt::Display for ModsChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.change_type, &self.old_path) {
            (ChangeType::Renamed, Some(old_path)) => {
                write!(f, "renamed {} -> {}", old_path, self.new_path)
            }
            (ChangeType::Created, _) => write!(f, "created {}", self.new_path),
            _ => write!(f, "deleted {}", self.new_path),
        }
    }
}

/// Callback invoked synchronously for every [`ModsChanged`] event
pub type Observer = Arc<dyn Fn(&ModsChanged) + Send + Sync>;

/// Handle returned by [`ModList::observe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Settings for opening a [`ModList`]
#[derive(Clone)]
pub struct ModListOptions {
    owner_id: String,
    display_name: Option<String>,
    root: Utf8PathBuf,
    codec: FolderNameCodec,
    deleter: Option<Arc<dyn ModDeleter>>,
    echo_window: Duration,
}

impl ModListOptions {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            owner_id: owner_id.into(),
            display_name: None,
            root: root.into(),
            codec: FolderNameCodec::default(),
            deleter: None,
            echo_window: WatchSettings::default().echo_window(),
        }
    }

    /// Name used in logs; defaults to the owner id
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn codec(mut self, codec: FolderNameCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Deletion collaborator; defaults to an [`FsDeleter`] recycling next to the root
    #[must_use]
    pub fn deleter(mut self, deleter: Arc<dyn ModDeleter>) -> Self {
        self.deleter = Some(deleter);
        self
    }

    #[must_use]
    pub fn echo_window(mut self, window: Duration) -> Self {
        self.echo_window = window;
        self
    }

    #[must_use]
    pub fn watch_settings(self, settings: &WatchSettings) -> Self {
        self.echo_window(settings.echo_window())
    }
}

#[derive(Default)]
struct ModListState {
    entries: IndexMap<ModId, ModEntry>,
}

impl ModListState {
    fn id_by_path(&self, path: &Utf8Path) -> Option<ModId> {
        self.entries
            .values()
            .find(|entry| entry.path() == path)
            .map(ModEntry::id)
    }
}

/// The mod folders of one character, kept consistent with the directory on disk
///
/// # Consistency
///
/// Disk state is authoritative and the entries are a cache of it. Every mutation, whether
/// requested by a caller or observed by the watcher, runs under the list's write lock, so
/// readers always see a consistent snapshot. Enable, disable and delete suppress the
/// watcher while they touch the disk, then publish their own event; the watcher's
/// notification of the same change is discarded instead of being applied twice.
///
/// # Events
///
/// [`ModsChanged`] events are delivered after the lock is released, first to callbacks
/// registered with [`observe`](Self::observe), then to [`subscribe`](Self::subscribe)
/// receivers. Observers may call back into the list.
///
/// Dropping the list disposes its watcher.
pub struct ModList {
    inner: Arc<ModListInner>,
}

struct ModListInner {
    owner: Arc<str>,
    display_name: String,
    root: Utf8PathBuf,
    codec: FolderNameCodec,
    deleter: Arc<dyn ModDeleter>,
    state: RwLock<ModListState>,
    suppression: Suppression,
    watcher: Mutex<Option<Box<dyn WatchAdapter>>>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer_id: AtomicU64,
    events_tx: broadcast::Sender<ModsChanged>,
    metrics: Metrics,
}

impl ModList {
    /// Open the mods folder described by `options`, start watching it and track every
    /// folder it currently contains.
    ///
    /// Watching starts before the initial scan, so a folder created while the list is
    /// opening is tracked exactly once.
    ///
    /// # Errors
    ///
    /// Fails if the root is not an existing directory, if the watcher cannot be started,
    /// or if the root cannot be listed.
    pub fn open(options: ModListOptions, source: &dyn WatchSource) -> Result<Self> {
        let root = options.root.canonicalize_utf8().map_err(|e| {
            ModListError::io(format!("Failed to open mods folder {}", options.root), e)
        })?;
        if !root.is_dir() {
            return Err(ModListError::io(
                format!("Failed to open mods folder {root}"),
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        let deleter = options.deleter.unwrap_or_else(|| {
            Arc::new(FsDeleter::new(
                DeletionSettings::default().recycle_dir_for(&root),
            ))
        });
        let display_name = options
            .display_name
            .unwrap_or_else(|| options.owner_id.clone());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new(ModListInner {
            owner: Arc::from(options.owner_id),
            display_name,
            root,
            codec: options.codec,
            deleter,
            state: RwLock::new(ModListState::default()),
            suppression: Suppression::new(options.echo_window),
            watcher: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(0),
            events_tx,
            metrics: Metrics::new(),
        });

        let weak = Arc::downgrade(&inner);
        let sink: EventSink = Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_watch_event(event);
            }
        });
        let adapter = source.watch(&inner.root, sink)?;
        *inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(adapter);

        let list = Self { inner };
        list.inner.scan()?;

        tracing::info!(
            character = %list.inner.display_name,
            path = %list.inner.root,
            mods = list.len(),
            "Opened mod list"
        );
        Ok(list)
    }

    /// Character id this list belongs to
    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    /// Canonical path of the watched folder
    pub fn root(&self) -> &Utf8Path {
        &self.inner.root
    }

    pub fn codec(&self) -> &FolderNameCodec {
        &self.inner.codec
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Start tracking a folder without touching the disk.
    ///
    /// The enabled state is derived from the folder name.
    ///
    /// # Errors
    ///
    /// [`ModListError::AlreadyTracked`] if the folder is tracked already,
    /// [`ModListError::OutsideRoot`] if it is not a direct child of the root.
    pub fn track(&self, descriptor: ModDescriptor) -> Result<ModId> {
        if descriptor.path().parent() != Some(self.inner.root.as_path()) {
            return Err(ModListError::OutsideRoot {
                path: descriptor.path().to_path_buf(),
                root: self.inner.root.clone(),
            });
        }

        let mut state = self.inner.write_state();
        if state.id_by_path(descriptor.path()).is_some() {
            return Err(ModListError::AlreadyTracked {
                path: descriptor.path().to_path_buf(),
            });
        }
        Ok(self.inner.insert_entry(&mut state, descriptor))
    }

    /// Stop tracking a folder without touching the disk
    pub fn untrack(&self, descriptor: &ModDescriptor) -> Result<ModEntry> {
        let mut state = self.inner.write_state();
        let removed = state
            .id_by_path(descriptor.path())
            .and_then(|id| state.entries.shift_remove(&id));

        match removed {
            Some(entry) => {
                tracing::debug!(
                    mod_name = entry.folder_name(),
                    character = %self.inner.display_name,
                    "Stopped tracking mod"
                );
                Ok(entry)
            }
            None => {
                tracing::warn!(
                    mod_name = descriptor.folder_name(),
                    character = %self.inner.display_name,
                    "Mod was not tracked"
                );
                Err(ModListError::NotTracked(descriptor.path().to_string()))
            }
        }
    }

    /// Enable a disabled mod by removing the disabled marker from its folder name
    ///
    /// # Errors
    ///
    /// - [`ModListError::NotTracked`] for unknown ids
    /// - [`ModListError::InvalidTransition`] if the mod is already enabled
    /// - [`ModListError::InvalidFolderName`] if nothing is left of the name once the
    ///   marker is removed
    /// - [`ModListError::NameCollision`] if the enabled folder name already exists
    /// - [`ModListError::Io`] if the rename fails; the entry is left unchanged
    pub fn enable(&self, id: ModId) -> Result<ModsChanged> {
        self.transition(id, ModState::Enabled)
    }

    /// Disable an enabled mod by adding the disabled marker to its folder name
    ///
    /// # Errors
    ///
    /// - [`ModListError::NotTracked`] for unknown ids
    /// - [`ModListError::InvalidTransition`] if the mod is already disabled
    /// - [`ModListError::InvalidFolderName`] if the marked name is not a valid folder name
    /// - [`ModListError::NameCollision`] if the disabled folder name already exists
    /// - [`ModListError::Io`] if the rename fails; the entry is left unchanged
    pub fn disable(&self, id: ModId) -> Result<ModsChanged> {
        self.transition(id, ModState::Disabled)
    }

    /// Whether the tracked folder is enabled
    pub fn is_enabled(&self, descriptor: &ModDescriptor) -> Result<bool> {
        let state = self.inner.read_state();
        state
            .id_by_path(descriptor.path())
            .and_then(|id| state.entries.get(&id))
            .map(ModEntry::is_enabled)
            .ok_or_else(|| ModListError::NotTracked(descriptor.path().to_string()))
    }

    /// Delete a tracked mod folder through the deletion collaborator.
    ///
    /// The entry stays tracked if the deletion fails.
    ///
    /// # Errors
    ///
    /// [`ModListError::NotTracked`] for unknown ids (nothing is deleted), or the
    /// deleter's error.
    pub fn delete_entry(&self, id: ModId, move_to_recycle_bin: bool) -> Result<ModsChanged> {
        let inner = &self.inner;
        let change = {
            let mut state = inner.write_state();
            let (path, mod_name) = state
                .entries
                .get(&id)
                .map(|entry| (entry.path().to_path_buf(), entry.folder_name().to_string()))
                .ok_or_else(|| ModListError::NotTracked(id.to_string()))?;

            {
                let mut guard = inner.suppression.begin(&inner.watcher);
                inner.deleter.delete(&path, move_to_recycle_bin)?;
                guard.expect_echo(WatchEvent::Deleted(path.clone()));
                state.entries.shift_remove(&id);
            }

            inner.metrics.record_deletion();
            tracing::info!(
                mod_name = %mod_name,
                character = %inner.display_name,
                "{} mod",
                if move_to_recycle_bin { "Recycled" } else { "Deleted" }
            );
            ModsChanged::deleted(path)
        };

        inner.publish(&change);
        Ok(change)
    }

    /// True if the enabled or disabled form of `candidate` already exists in the root.
    ///
    /// `candidate` may be a bare folder name or a full path, in which case its final
    /// component is used.
    pub fn folder_name_collides(&self, candidate: &str) -> bool {
        let Some(name) = Utf8Path::new(candidate).file_name() else {
            return false;
        };

        let enabled = self.inner.codec.strip_disabled_marker(name);
        let disabled = self.inner.codec.apply_disabled_marker(name);

        (!enabled.is_empty() && self.inner.root.join(enabled).exists())
            || self.inner.root.join(disabled).exists()
    }

    /// Set or clear (with an empty name) the custom display name of a mod
    pub fn set_custom_name(&self, id: ModId, name: impl Into<String>) -> Result<()> {
        let mut state = self.inner.write_state();
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| ModListError::NotTracked(id.to_string()))?;
        entry.descriptor_mut().set_custom_name(name);
        tracing::debug!(
            mod_name = entry.folder_name(),
            custom_name = entry.descriptor().custom_name(),
            "Set custom mod name"
        );
        Ok(())
    }

    /// Re-list the root folder and reconcile differences the watcher may have missed.
    ///
    /// Returns the published events.
    pub fn refresh(&self) -> Result<Vec<ModsChanged>> {
        let changes = self.inner.scan()?;
        for change in &changes {
            self.inner.publish(change);
        }
        Ok(changes)
    }

    /// Snapshot of all entries in tracking order
    pub fn entries(&self) -> Vec<ModEntry> {
        self.read(|entries| entries.values().cloned().collect())
    }

    pub fn get(&self, id: ModId) -> Option<ModEntry> {
        self.read(|entries| entries.get(&id).cloned())
    }

    pub fn find_by_path(&self, path: &Utf8Path) -> Option<ModEntry> {
        self.read(|entries| entries.values().find(|entry| entry.path() == path).cloned())
    }

    /// Find an entry by exact folder name, falling back to a case-insensitive match that
    /// ignores disabled markers
    pub fn find_by_folder_name(&self, name: &str) -> Option<ModEntry> {
        let codec = &self.inner.codec;
        let wanted = codec.strip_disabled_marker(name);
        self.read(|entries| {
            entries
                .values()
                .find(|entry| entry.folder_name() == name)
                .or_else(|| {
                    entries.values().find(|entry| {
                        codec
                            .strip_disabled_marker(entry.folder_name())
                            .eq_ignore_ascii_case(wanted)
                    })
                })
                .cloned()
        })
    }

    /// Execute a function with read access to the entries
    ///
    /// # Example
    /// ```ignore
    /// let names: Vec<String> = list.read(|entries| {
    ///     entries.values().map(|e| e.display_name().to_string()).collect()
    /// });
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&IndexMap<ModId, ModEntry>) -> R,
    {
        let state = self.inner.read_state();
        f(&state.entries)
    }

    pub fn len(&self) -> usize {
        self.read(IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enabled_count(&self) -> usize {
        self.read(|entries| entries.values().filter(|entry| entry.is_enabled()).count())
    }

    /// True if more than one mod is enabled at the same time
    pub fn has_multiple_enabled(&self) -> bool {
        self.enabled_count() > 1
    }

    /// Register a callback for [`ModsChanged`] events
    pub fn observe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&ModsChanged) + Send + Sync + 'static,
    {
        let id = ObserverId(self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(observer)));
        id
    }

    /// Remove a callback; returns `false` if it was not registered
    pub fn unobserve(&self, id: ObserverId) -> bool {
        let mut observers = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Receive [`ModsChanged`] events through a broadcast channel
    pub fn subscribe(&self) -> broadcast::Receiver<ModsChanged> {
        self.inner.events_tx.subscribe()
    }

    /// True while the watcher has not been disposed
    pub fn is_watching(&self) -> bool {
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the watcher permanently. The entries stay readable and programmatic
    /// operations keep working, but external changes are no longer observed.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    fn transition(&self, id: ModId, target: ModState) -> Result<ModsChanged> {
        let inner = &self.inner;
        let change = {
            let mut state = inner.write_state();
            let entry = state
                .entries
                .get(&id)
                .ok_or_else(|| ModListError::NotTracked(id.to_string()))?;

            if entry.state() == target {
                return Err(ModListError::InvalidTransition {
                    name: entry.folder_name().to_string(),
                    state: target,
                });
            }

            let new_name = match target {
                ModState::Enabled => inner
                    .codec
                    .strip_disabled_marker(entry.folder_name())
                    .to_string(),
                ModState::Disabled => inner.codec.apply_disabled_marker(entry.folder_name()),
            };
            if new_name.is_empty() {
                return Err(ModListError::InvalidFolderName(format!(
                    "{} has no name without its disabled marker",
                    entry.folder_name()
                )));
            }

            let old_path = entry.path().to_path_buf();
            let new_path = inner.root.join(&new_name);
            if new_path.exists() {
                return Err(ModListError::NameCollision { name: new_name });
            }
            let descriptor = entry.descriptor().renamed_to(new_path.clone())?;

            {
                let mut guard = inner.suppression.begin(&inner.watcher);
                fs::rename(&old_path, &new_path).map_err(|e| {
                    ModListError::io(format!("Failed to rename {old_path} to {new_path}"), e)
                })?;
                guard.expect_rename_echo(old_path.clone(), new_path.clone());

                if let Some(entry) = state.entries.get_mut(&id) {
                    entry.replace_descriptor(descriptor);
                    entry.set_enabled(target.is_enabled());
                }
            }

            inner.metrics.record_rename();
            tracing::info!(
                mod_name = %new_name,
                character = %inner.display_name,
                path = %new_path,
                "Mod {}",
                target
            );
            ModsChanged::renamed(new_path, old_path)
        };

        inner.publish(&change);
        Ok(change)
    }
}

impl fmt::Display for ModList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} mods)", self.inner.display_name, self.len())
    }
}

impl fmt::Debug for ModList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModList")
            .field("owner", &self.inner.owner)
            .field("root", &self.inner.root)
            .field("mods", &self.len())
            .finish()
    }
}

impl Drop for ModList {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl ModListInner {
    fn read_state(&self) -> RwLockReadGuard<'_, ModListState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ModListState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_entry(&self, state: &mut ModListState, descriptor: ModDescriptor) -> ModId {
        let enabled = !self.codec.is_disabled_name(descriptor.folder_name());
        let entry = ModEntry::new(descriptor, self.owner.clone(), enabled);
        let id = entry.id();
        tracing::debug!(
            mod_name = entry.folder_name(),
            character = %self.display_name,
            enabled,
            "Tracking mod"
        );
        state.entries.insert(id, entry);
        id
    }

    /// Bring the entries in line with the folders currently in the root
    fn scan(&self) -> Result<Vec<ModsChanged>> {
        let folders = self.list_folders()?;
        let present: HashSet<&Utf8Path> = folders.iter().map(Utf8PathBuf::as_path).collect();

        let mut state = self.write_state();
        let mut changes = Vec::new();

        let vanished: Vec<ModId> = state
            .entries
            .values()
            .filter(|entry| !present.contains(entry.path()))
            .map(ModEntry::id)
            .collect();
        for id in vanished {
            if let Some(entry) = state.entries.shift_remove(&id) {
                changes.push(ModsChanged::deleted(entry.path()));
            }
        }

        for folder in &folders {
            if state.id_by_path(folder).is_none() {
                let descriptor = ModDescriptor::new(folder.clone())?;
                self.insert_entry(&mut state, descriptor);
                changes.push(ModsChanged::created(folder.clone()));
            }
        }

        Ok(changes)
    }

    fn list_folders(&self) -> Result<Vec<Utf8PathBuf>> {
        let read_dir = fs::read_dir(&self.root)
            .map_err(|e| ModListError::io(format!("Failed to list {}", self.root), e))?;

        let mut folders = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry
                .map_err(|e| ModListError::io(format!("Failed to list {}", self.root), e))?;
            match Utf8PathBuf::from_path_buf(dir_entry.path()) {
                Ok(path) if path.is_dir() => folders.push(path),
                Ok(_) => {}
                Err(path) => {
                    tracing::warn!(path = %path.display(), "Skipping mod folder with non UTF-8 name");
                }
            }
        }
        folders.sort();
        Ok(folders)
    }

    fn handle_watch_event(&self, event: WatchEvent) {
        if self.suppression.is_active() {
            self.metrics.record_suppressed();
            // An echo seen here must not match a later external event
            self.suppression.consume_echo(&event);
            tracing::debug!(?event, character = %self.display_name, "Suppressed watcher event");
            return;
        }

        if let WatchEvent::Error(message) = &event {
            self.metrics.record_watcher_error();
            tracing::error!(
                error = %message,
                character = %self.display_name,
                "Error in mods folder watcher"
            );
            return;
        }

        let change = {
            let mut state = self.write_state();
            if self.suppression.consume_echo(&event) {
                self.metrics.record_echo_discarded();
                tracing::debug!(?event, character = %self.display_name, "Discarded echo of own change");
                return;
            }
            self.suppression.invalidate(&event);
            self.reconcile(&mut state, event)
        };

        if let Some(change) = change {
            self.metrics.record_reconciled();
            self.publish(&change);
        }
    }

    fn reconcile(&self, state: &mut ModListState, event: WatchEvent) -> Option<ModsChanged> {
        match event {
            WatchEvent::Created(path) => {
                tracing::info!(
                    mod_name = path.file_name().unwrap_or_default(),
                    character = %self.display_name,
                    "Mod folder was created"
                );
                if state.id_by_path(&path).is_some() {
                    tracing::warn!(path = %path, character = %self.display_name, "Created folder was already tracked");
                    return None;
                }
                match ModDescriptor::new(path.clone()) {
                    Ok(descriptor) => {
                        self.insert_entry(state, descriptor);
                        Some(ModsChanged::created(path))
                    }
                    Err(err) => {
                        tracing::warn!(path = %path, error = %err, "Ignoring created folder");
                        None
                    }
                }
            }
            WatchEvent::Deleted(path) => {
                tracing::info!(
                    mod_name = path.file_name().unwrap_or_default(),
                    character = %self.display_name,
                    "Mod folder was deleted"
                );
                match state.id_by_path(&path) {
                    Some(id) => {
                        state.entries.shift_remove(&id);
                    }
                    None => {
                        tracing::warn!(path = %path, character = %self.display_name, "Deleted folder was not tracked");
                    }
                }
                Some(ModsChanged::deleted(path))
            }
            WatchEvent::Renamed { old, new } => {
                tracing::info!(old = %old, new = %new, character = %self.display_name, "Mod folder was renamed");
                match state.id_by_path(&old) {
                    Some(id) => self.apply_rename(state, id, &new),
                    None => {
                        tracing::warn!(path = %old, character = %self.display_name, "Renamed folder was not tracked");
                    }
                }
                Some(ModsChanged::renamed(new, old))
            }
            WatchEvent::Error(_) => None,
        }
    }

    /// Move an entry to `new` in place, keeping its id and custom name
    fn apply_rename(&self, state: &mut ModListState, id: ModId, new: &Utf8Path) {
        if let Some(stale) = state.id_by_path(new).filter(|stale| *stale != id) {
            tracing::warn!(path = %new, "Dropping stale entry at rename target");
            state.entries.shift_remove(&stale);
        }

        let enabled = !self
            .codec
            .is_disabled_name(new.file_name().unwrap_or_default());
        if let Some(entry) = state.entries.get_mut(&id) {
            match entry.descriptor().renamed_to(new) {
                Ok(descriptor) => {
                    entry.replace_descriptor(descriptor);
                    entry.set_enabled(enabled);
                }
                Err(err) => {
                    tracing::warn!(path = %new, error = %err, "Ignoring rename to invalid folder name");
                }
            }
        }
    }

    fn publish(&self, change: &ModsChanged) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in observers {
            observer(change);
        }

        // Ignore send errors - it's OK if no one is listening
        let _ = self.events_tx.send(change.clone());
        self.metrics.record_published();
    }

    fn dispose(&self) {
        let adapter = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut adapter) = adapter {
            adapter.dispose();
            tracing::debug!(character = %self.display_name, "Disposed mods folder watcher");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::ManualWatchSource;
    use tempfile::TempDir;

    fn open_list(folders: &[&str]) -> (TempDir, ModList, ManualWatchSource) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().join("keqing")).unwrap();
        fs::create_dir_all(&root).unwrap();
        for folder in folders {
            fs::create_dir(root.join(folder)).unwrap();
        }

        let source = ManualWatchSource::new();
        let list = ModList::open(ModListOptions::new("keqing", root), &source).unwrap();
        (temp_dir, list, source)
    }

    #[test]
    fn test_mods_changed_constructors() {
        let created = ModsChanged::created("/mods/a");
        assert_eq!(created.change_type(), ChangeType::Created);
        assert_eq!(created.old_path(), None);

        let renamed = ModsChanged::renamed("/mods/b", "/mods/a");
        assert_eq!(renamed.change_type(), ChangeType::Renamed);
        assert_eq!(renamed.old_path(), Some(Utf8Path::new("/mods/a")));
        assert_eq!(renamed.to_string(), "renamed /mods/a -> /mods/b");
    }

    #[test]
    fn test_open_tracks_existing_folders_in_order() {
        let (_temp_dir, list, _source) = open_list(&["Bob", "Alice", "DISABLED_Carol"]);

        let names: Vec<String> = list
            .entries()
            .iter()
            .map(|entry| entry.folder_name().to_string())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob", "DISABLED_Carol"]);
        assert_eq!(list.enabled_count(), 2);
        assert!(list.has_multiple_enabled());
        assert_eq!(list.to_string(), "keqing (3 mods)");
    }

    #[test]
    fn test_open_ignores_loose_files() {
        let (_temp_dir, list, _source) = open_list(&["Alice"]);
        fs::write(list.root().join("readme.txt"), b"hi").unwrap();

        assert!(list.refresh().unwrap().is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_open_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().join("missing")).unwrap();
        let result = ModList::open(ModListOptions::new("keqing", root), &ManualWatchSource::new());
        assert!(matches!(result, Err(ModListError::Io { .. })));
    }

    #[test]
    fn test_track_rejects_foreign_paths() {
        let (_temp_dir, list, _source) = open_list(&[]);
        let descriptor = ModDescriptor::new("/somewhere/else/Alice").unwrap();
        assert!(matches!(
            list.track(descriptor),
            Err(ModListError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_observers_receive_events_until_removed() {
        let (_temp_dir, list, source) = open_list(&[]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer_seen = seen.clone();
        let id = list.observe(move |change| observer_seen.lock().unwrap().push(change.clone()));

        let alice = list.root().join("Alice");
        fs::create_dir(&alice).unwrap();
        source.emit(WatchEvent::Created(alice.clone()));

        assert!(list.unobserve(id));
        assert!(!list.unobserve(id));
        source.emit(WatchEvent::Deleted(alice.clone()));

        assert_eq!(*seen.lock().unwrap(), vec![ModsChanged::created(alice)]);
    }

    #[test]
    fn test_observer_can_read_list_during_delivery() {
        let (_temp_dir, list, source) = open_list(&[]);
        let list = Arc::new(list);
        let counts = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&list);
        let observer_counts = counts.clone();
        list.observe(move |_change| {
            if let Some(list) = weak.upgrade() {
                observer_counts.lock().unwrap().push(list.len());
            }
        });

        let alice = list.root().join("Alice");
        fs::create_dir(&alice).unwrap();
        source.emit(WatchEvent::Created(alice));

        assert_eq!(*counts.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_watcher_error_is_counted_not_applied() {
        let (_temp_dir, list, source) = open_list(&["Alice"]);
        source.emit(WatchEvent::Error("buffer overflow".to_string()));

        assert_eq!(list.metrics().watcher_errors.load(Ordering::Relaxed), 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_dispose_stops_delivery() {
        let (_temp_dir, list, source) = open_list(&[]);
        assert!(list.is_watching());

        list.dispose();
        assert!(!list.is_watching());
        assert_eq!(source.subscription_count(), 0);

        let alice = list.root().join("Alice");
        assert!(!source.emit(WatchEvent::Created(alice)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_permanent_delete_passes_flag_to_deleter() {
        let mut deleter = crate::services::deletion::MockModDeleter::new();
        deleter
            .expect_delete()
            .withf(|_path, recycle| !*recycle)
            .times(1)
            .returning(|_, _| Ok(()));

        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().join("keqing")).unwrap();
        fs::create_dir_all(root.join("Alice")).unwrap();
        let options = ModListOptions::new("keqing", root).deleter(Arc::new(deleter));
        let list = ModList::open(options, &ManualWatchSource::new()).unwrap();
        let id = list.entries()[0].id();

        let change = list.delete_entry(id, false).unwrap();

        assert_eq!(change.change_type(), ChangeType::Deleted);
        assert!(list.is_empty());
    }

    #[test]
    fn test_set_custom_name() {
        let (_temp_dir, list, _source) = open_list(&["Alice"]);
        let id = list.entries()[0].id();

        list.set_custom_name(id, "Alice's Outfit").unwrap();
        assert_eq!(list.get(id).unwrap().display_name(), "Alice's Outfit");

        assert!(matches!(
            list.set_custom_name(ModId::new(), "nobody"),
            Err(ModListError::NotTracked(_))
        ));
    }
}
