//! Navigation, paging and file operations over one catalog.
//!
//! State machine:
//!
//! ```text
//! NotPresent --mount--> Starting --state()--> Loading --build ok--> Ready
//!      ^                                        |  ^                  |
//!      +------------ build error / unmount -----+  +-- load_directory-+
//! ```
//!
//! Per-index accessors only read the arena while the session is `Ready`; every other state
//! yields neutral defaults.

use std::sync::Arc;
use std::time::Instant;

use crate::arena::{CatalogEntry, EntryArena, EntryHandle};
use crate::catalog::build_catalog;
use crate::config::FileManagerConfig;
use crate::core::{
    DialogType, FileType, LoadState, SortOrder, ends_with_no_case, parent_dir, split_extension,
};
use crate::dispatch::{DispatchGate, FsRequest};
use crate::error::{FileManagerError, Result};
use crate::host::{FileActions, Page, Preferences, TextInputPurpose, UiHost};
use crate::image_decode::{DecodedImage, ImageDecoder};
use crate::sort::sort_catalog;
use crate::storage::{SpaceInfo, StorageDriver};

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Shown in place of an empty current directory.
pub const ROOT_DIRECTORY_LABEL: &str = "/<Root directory>";
/// Label of the modal shown while an image decodes.
pub const IMAGE_LOADING_LABEL: &str = "Loading...";
/// Free space (percent) below which the storage alarm is raised.
pub const STORAGE_ALARM_FREE_PERCENT: u64 = 10;

/// Called with the full path picked in a file browser.
pub type FileSelectedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Progress of an image open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageLoadStatus {
    /// No image is being opened.
    Idle,
    /// Decode requested, not finished.
    Loading,
    /// The image viewer page has been pushed.
    Ready,
    /// Decoding failed and the error was shown.
    Failed,
}

#[derive(Debug)]
enum ImageLoad {
    Idle,
    Loading,
    Ready(DecodedImage),
    Failed(String),
}

struct BrowseRequest {
    title: String,
    file_type: FileType,
    dialog: DialogType,
    on_selected: FileSelectedCallback,
}

/// Side effects that must run after the session lock is released.
pub(crate) enum Deferred {
    Post(FsRequest),
    FileSelected(FileSelectedCallback, String),
}

/// Collaborators and configuration a session is built from.
pub(crate) struct SessionParts {
    pub(crate) config: FileManagerConfig,
    pub(crate) storage: Box<dyn StorageDriver>,
    pub(crate) preferences: Box<dyn Preferences>,
    pub(crate) ui: Box<dyn UiHost>,
    pub(crate) actions: Box<dyn FileActions>,
    pub(crate) image_decoder: Box<dyn ImageDecoder>,
}

/// All state of one file manager or file browser view.
///
/// Obtained through [`FileManager::lock`](crate::FileManager::lock).
pub struct FileManagerSession {
    config: FileManagerConfig,
    gate: DispatchGate,
    outbox: Vec<Deferred>,

    storage: Box<dyn StorageDriver>,
    preferences: Box<dyn Preferences>,
    ui: Box<dyn UiHost>,
    actions: Box<dyn FileActions>,
    image_decoder: Box<dyn ImageDecoder>,

    arena: EntryArena,
    state: LoadState,
    loading_started_at: Instant,
    current_dir: String,
    entry_count: usize,
    scroll_start: usize,
    saved_scroll_start: usize,
    selected_index: Option<usize>,
    truncated: bool,
    rebuilds: u64,

    browse: Option<BrowseRequest>,
    image: ImageLoad,
    opened_image: Option<DecodedImage>,
    space_info: Option<SpaceInfo>,
}

impl FileManagerSession {
    pub(crate) fn new(parts: SessionParts, gate: DispatchGate) -> Self {
        let state = if parts.storage.is_mounted() {
            LoadState::Starting
        } else {
            LoadState::NotPresent
        };
        Self {
            arena: EntryArena::with_capacity(parts.config.arena_bytes),
            config: parts.config,
            gate,
            outbox: Vec::new(),
            storage: parts.storage,
            preferences: parts.preferences,
            ui: parts.ui,
            actions: parts.actions,
            image_decoder: parts.image_decoder,
            state,
            loading_started_at: Instant::now(),
            current_dir: String::new(),
            entry_count: 0,
            scroll_start: 0,
            saved_scroll_start: 0,
            selected_index: None,
            truncated: false,
            rebuilds: 0,
            browse: None,
            image: ImageLoad::Idle,
            opened_image: None,
            space_info: None,
        }
    }

    pub(crate) fn gate(&self) -> &DispatchGate {
        &self.gate
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<Deferred> {
        std::mem::take(&mut self.outbox)
    }

    fn defer(&mut self, request: FsRequest) {
        self.outbox.push(Deferred::Post(request));
    }

    fn report(&mut self, op: &'static str, err: FileManagerError) {
        trace_operation_failed(op, &err);
        self.ui.show_error(&err);
    }

    /// Storage medium inserted or removed.
    pub fn on_medium_mount_changed(&mut self, mounted: bool) {
        if mounted {
            self.state = LoadState::Starting;
        } else {
            self.state = LoadState::NotPresent;
            self.entry_count = 0;
            self.selected_index = None;
            self.space_info = None;
        }
    }

    /// User-visible state. See [`state_at`](Self::state_at).
    pub fn state(&mut self) -> LoadState {
        self.state_at(Instant::now())
    }

    /// User-visible state at `now`.
    ///
    /// `Starting` kicks off the first load. While a load is younger than the configured dwell
    /// this keeps reporting `Starting` so quick loads never flash a `Loading` placeholder.
    pub fn state_at(&mut self, now: Instant) -> LoadState {
        match self.state {
            LoadState::Starting => {
                self.load_directory_at(now);
                LoadState::Starting
            }
            LoadState::Loading
                if now.saturating_duration_since(self.loading_started_at)
                    < self.config.starting_dwell =>
            {
                LoadState::Starting
            }
            state => state,
        }
    }

    /// Real state, without dwell or side effects.
    pub fn raw_state(&self) -> LoadState {
        self.state
    }

    /// Rebuild the catalog of the current directory. No-op while a load is running.
    pub fn load_directory(&mut self) {
        self.load_directory_at(Instant::now());
    }

    fn load_directory_at(&mut self, now: Instant) {
        if self.state == LoadState::Loading {
            return;
        }
        self.state = LoadState::Loading;
        self.entry_count = 0;
        self.selected_index = None;
        self.saved_scroll_start = self.scroll_start;
        self.scroll_start = 0;
        self.loading_started_at = now;

        let deferred = !self.gate.is_owner_thread();
        trace_load_requested(&self.current_dir, deferred);
        if deferred {
            self.defer(FsRequest::LoadDirectory);
        } else {
            self.do_load_directory();
        }
    }

    fn do_load_directory(&mut self) {
        if self.state != LoadState::Loading {
            return;
        }
        self.rebuilds += 1;
        let filter = self.browse.as_ref().map(|b| b.file_type);
        match build_catalog(
            self.storage.as_mut(),
            &mut self.arena,
            &self.current_dir,
            filter,
        ) {
            Ok(stats) => {
                sort_catalog(&mut self.arena, self.preferences.sort_order());
                self.entry_count = stats.count;
                self.truncated = stats.truncated;
                self.set_scroll_start(self.saved_scroll_start);
                self.state = LoadState::Ready;
                trace_load_completed(
                    &self.current_dir,
                    stats.count,
                    stats.truncated,
                    self.loading_started_at.elapsed().as_millis(),
                );
                self.do_refresh_storage_info();
            }
            Err(err) => {
                trace_load_failed(&self.current_dir, &err);
                self.entry_count = 0;
                self.truncated = false;
                self.state = LoadState::NotPresent;
            }
        }
    }

    /// Run one request on the owner thread. `Shutdown` is ignored here.
    pub(crate) fn handle_request(&mut self, request: FsRequest) {
        match request {
            FsRequest::LoadDirectory => self.do_load_directory(),
            FsRequest::Rename { path, stem } => self.do_rename(&path, &stem),
            FsRequest::Delete { path } => self.do_delete(&path),
            FsRequest::Upload { path } => self.do_upload(&path),
            FsRequest::OpenImage { path } => self.do_open_image(&path),
            FsRequest::RefreshStorageInfo => self.do_refresh_storage_info(),
            FsRequest::Shutdown => {}
        }
    }

    /// Current directory; empty for the root.
    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }

    /// Current directory for display.
    pub fn current_dir_display(&self) -> &str {
        if self.current_dir.is_empty() {
            ROOT_DIRECTORY_LABEL
        } else {
            &self.current_dir
        }
    }

    /// Whether the root directory is shown.
    pub fn is_root_directory(&self) -> bool {
        self.current_dir.is_empty()
    }

    /// Open subdirectory `name` of the current directory. Ignored unless `Ready`.
    pub fn enter_directory(&mut self, name: &str) -> Result<()> {
        if self.state != LoadState::Ready {
            return Ok(());
        }
        let path = self.entry_path(name)?;
        self.current_dir = path;
        self.load_directory();
        Ok(())
    }

    /// Go one directory up. Ignored unless `Ready`; the root stays the root.
    pub fn go_to_parent(&mut self) {
        if self.state != LoadState::Ready {
            return;
        }
        let len = parent_dir(&self.current_dir).len();
        self.current_dir.truncate(len);
        self.load_directory();
    }

    /// Rows per page: smaller while picking a file.
    pub fn page_size(&self) -> usize {
        self.config.page_size(self.is_browse_mode())
    }

    /// Committed entries; 0 unless `Ready`.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Index of the first visible row.
    pub fn scroll_start(&self) -> usize {
        self.scroll_start
    }

    /// Scroll so `position` is the first row, clamped so the page never runs past the end.
    pub fn set_scroll_start(&mut self, position: usize) {
        let last_start = self.entry_count.saturating_sub(self.page_size());
        self.scroll_start = position.min(last_start);
    }

    /// Scroll by encoder detents.
    pub fn on_encoder(&mut self, delta: i32) {
        let position = (self.scroll_start as i64).saturating_add(i64::from(delta)).max(0);
        self.set_scroll_start(usize::try_from(position).unwrap_or(usize::MAX));
    }

    /// Whether the arena filled up during the last load.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Catalog builds run so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Entry at `index` while `Ready`.
    pub fn entry(&self, index: usize) -> Option<CatalogEntry<'_>> {
        if self.state != LoadState::Ready || index >= self.entry_count {
            return None;
        }
        self.arena.entry(index)
    }

    /// Handle for `index` that stops resolving after the next reload.
    pub fn entry_handle(&self, index: usize) -> Option<EntryHandle> {
        self.entry(index)?;
        self.arena.handle(index)
    }

    /// Resolve a handle taken with [`entry_handle`](Self::entry_handle).
    pub fn resolve(&self, handle: EntryHandle) -> Option<CatalogEntry<'_>> {
        if self.state != LoadState::Ready {
            return None;
        }
        self.arena.resolve(handle)
    }

    /// Whether row `index` is a directory.
    pub fn is_directory(&self, index: usize) -> bool {
        self.entry(index).is_some_and(|e| e.is_dir())
    }

    /// Type of row `index`.
    pub fn entry_type(&self, index: usize) -> FileType {
        self.entry(index).map_or(FileType::Other, |e| e.kind)
    }

    /// Name of row `index`.
    pub fn name(&self, index: usize) -> &str {
        self.entry(index).map_or("", |e| e.name)
    }

    /// Size of row `index`.
    pub fn size(&self, index: usize) -> u32 {
        self.entry(index).map_or(0, |e| e.size)
    }

    /// Modification timestamp of row `index`.
    pub fn modified(&self, index: usize) -> u32 {
        self.entry(index).map_or(0, |e| e.modified)
    }

    /// Selected row, if any.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    /// Whether row `index` is highlighted as selected.
    pub fn is_selected(&self, index: usize) -> bool {
        (self.ui.is_page_on_stack(Page::FileBrowser) || self.ui.is_page_on_stack(Page::FileMenu))
            && self.selected_index == Some(index)
    }

    /// Activate row `index`: directories are entered, files selected (and in the file
    /// manager the file menu is opened). Ignored unless `Ready`.
    pub fn select_entry(&mut self, index: usize) {
        let Some(entry) = self.entry(index) else {
            return;
        };
        if entry.is_dir() {
            let name = entry.name.to_string();
            if let Err(err) = self.enter_directory(&name) {
                self.report("enter_directory", err);
            }
            return;
        }
        self.selected_index = Some(index);
        if !self.is_browse_mode() {
            self.ui.push_page(Page::FileMenu);
        }
    }

    fn entry_path(&self, name: &str) -> Result<String> {
        let len = self.current_dir.len() + 1 + name.len();
        let max = self.preferences.max_path_length();
        if len > max {
            return Err(FileManagerError::PathTooLong { len, max });
        }
        Ok(format!("{}/{}", self.current_dir, name))
    }

    fn selected_entry(&self) -> Option<CatalogEntry<'_>> {
        self.entry(self.selected_index?)
    }

    fn selected_handle(&self) -> Option<EntryHandle> {
        self.entry_handle(self.selected_index?)
    }

    /// Full path of the selected file. Requests carry it; the owner thread never re-reads the
    /// selection. An overlong path is reported here.
    fn selected_path(&mut self, op: &'static str) -> Option<String> {
        let entry = self.selected_entry()?;
        match self.entry_path(entry.name) {
            Ok(path) => Some(path),
            Err(err) => {
                self.report(op, err);
                None
            }
        }
    }

    fn close_file_menu(&mut self) {
        if self.ui.is_page_on_stack(Page::FileMenu) {
            self.ui.pop_page();
        }
    }

    /// Whether the selected file can be opened now.
    pub fn is_open_enabled(&self) -> bool {
        match self.selected_entry().map(|e| e.kind) {
            Some(FileType::DataLog | FileType::Image) => true,
            Some(FileType::Script) => self.actions.is_script_engine_idle(),
            _ => false,
        }
    }

    /// Open the selected file according to its type.
    pub fn open_selected(&mut self) {
        self.close_file_menu();
        let Some(kind) = self.selected_entry().map(|e| e.kind) else {
            return;
        };
        let Some(path) = self.selected_path("open") else {
            return;
        };
        match kind {
            FileType::DataLog => {
                self.actions.open_data_log(&path);
                self.ui.push_page(Page::DlogView);
            }
            FileType::Image => self.open_image(path),
            FileType::Script => {
                if self.actions.is_script_engine_idle() {
                    self.actions.start_script(&path);
                }
            }
            FileType::Directory | FileType::Other => {}
        }
    }

    fn open_image(&mut self, path: String) {
        self.image = ImageLoad::Loading;
        self.opened_image = None;
        self.ui.show_async_operation(IMAGE_LOADING_LABEL);
        if self.gate.is_owner_thread() {
            self.do_open_image(&path);
        } else {
            self.defer(FsRequest::OpenImage { path });
        }
    }

    fn do_open_image(&mut self, path: &str) {
        self.image = match self.image_decoder.decode(self.storage.as_mut(), path) {
            Ok(image) => ImageLoad::Ready(image),
            Err(message) => ImageLoad::Failed(message),
        };
    }

    /// Poll an image open. On completion the loading modal is closed and either the image
    /// viewer is pushed or the failure is shown.
    pub fn poll_image_loading(&mut self) -> ImageLoadStatus {
        match std::mem::replace(&mut self.image, ImageLoad::Idle) {
            ImageLoad::Idle => ImageLoadStatus::Idle,
            ImageLoad::Loading => {
                self.image = ImageLoad::Loading;
                ImageLoadStatus::Loading
            }
            ImageLoad::Ready(image) => {
                self.opened_image = Some(image);
                self.ui.pop_page();
                self.ui.push_page(Page::ImageView);
                ImageLoadStatus::Ready
            }
            ImageLoad::Failed(message) => {
                self.ui.pop_page();
                self.report("open_image", FileManagerError::ImageDecode(message));
                ImageLoadStatus::Failed
            }
        }
    }

    /// Image shown by the viewer page.
    pub fn opened_image(&self) -> Option<&DecodedImage> {
        self.opened_image.as_ref()
    }

    /// Release the decoded image once the viewer closes.
    pub fn close_opened_image(&mut self) {
        self.opened_image = None;
    }

    /// Start renaming the selected file: the keypad is seeded with its name minus extension.
    pub fn rename_selected(&mut self) {
        self.close_file_menu();
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let stem = split_extension(entry.name).0.to_string();
        let max_len = self.preferences.max_path_length();
        self.ui
            .start_text_input(TextInputPurpose::Rename, &stem, max_len);
    }

    /// Keypad answer to [`rename_selected`](Self::rename_selected). The original extension is
    /// kept.
    pub fn on_rename_input(&mut self, stem: &str) {
        let Some(path) = self.selected_path("rename") else {
            return;
        };
        if self.gate.is_owner_thread() {
            self.do_rename(&path, stem);
        } else {
            self.defer(FsRequest::Rename {
                path,
                stem: stem.to_string(),
            });
        }
    }

    fn do_rename(&mut self, path: &str, stem: &str) {
        if let Err(err) = self.try_rename(path, stem) {
            self.report("rename", err);
        }
    }

    fn try_rename(&mut self, path: &str, stem: &str) -> Result<()> {
        let dir = parent_dir(path);
        let (_, extension) = split_extension(&path[dir.len()..]);
        let dst = format!("{dir}/{stem}{extension}");
        let max = self.preferences.max_path_length();
        if dst.len() > max {
            return Err(FileManagerError::PathTooLong {
                len: dst.len(),
                max,
            });
        }
        self.storage
            .rename(path, &dst)
            .map_err(|e| FileManagerError::storage("rename", e))?;
        trace_file_operation("rename", path);
        self.on_storage_file_changed(path, Some(&dst));
        Ok(())
    }

    /// Delete the selected file.
    pub fn delete_selected(&mut self) {
        self.close_file_menu();
        let Some(path) = self.selected_path("delete") else {
            return;
        };
        if self.gate.is_owner_thread() {
            self.do_delete(&path);
        } else {
            self.defer(FsRequest::Delete { path });
        }
    }

    fn do_delete(&mut self, path: &str) {
        if let Err(err) = self.try_delete(path) {
            self.report("delete", err);
        }
    }

    fn try_delete(&mut self, path: &str) -> Result<()> {
        self.storage
            .remove(path)
            .map_err(|e| FileManagerError::storage("delete", e))?;
        trace_file_operation("delete", path);
        self.on_storage_file_changed(path, None);
        Ok(())
    }

    /// Whether a remote client is connected to receive uploads.
    pub fn is_upload_enabled(&self) -> bool {
        self.actions.is_upload_link_connected()
    }

    /// Send the selected file to the connected remote client.
    pub fn upload_selected(&mut self) {
        self.close_file_menu();
        let Some(path) = self.selected_path("upload") else {
            return;
        };
        if self.gate.is_owner_thread() {
            self.do_upload(&path);
        } else {
            self.defer(FsRequest::Upload { path });
        }
    }

    fn do_upload(&mut self, path: &str) {
        if let Err(err) = self.try_upload(path) {
            self.report("upload", err);
        }
    }

    fn try_upload(&mut self, path: &str) -> Result<()> {
        if !self.actions.is_upload_link_connected() {
            return Ok(());
        }
        self.actions
            .upload(path)
            .map_err(|e| FileManagerError::storage("upload", e))?;
        trace_file_operation("upload", path);
        Ok(())
    }

    /// Persisted sort order.
    pub fn sort_order(&self) -> SortOrder {
        self.preferences.sort_order()
    }

    /// Persist `order`, re-sort the current catalog and scroll back to the top. The selection
    /// stays on the same file.
    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.preferences.set_sort_order(order);
        if self.state == LoadState::Ready {
            let selected = self.selected_handle();
            sort_catalog(&mut self.arena, order);
            self.selected_index = selected.and_then(|h| self.arena.position(h));
        }
        self.scroll_start = 0;
    }

    /// Re-query used/free space on the owner thread.
    pub fn refresh_storage_info(&mut self) {
        if self.gate.is_owner_thread() {
            self.do_refresh_storage_info();
        } else {
            self.defer(FsRequest::RefreshStorageInfo);
        }
    }

    fn do_refresh_storage_info(&mut self) {
        self.space_info = match self.storage.space_info() {
            Ok(info) => Some(info),
            Err(err) => {
                trace_operation_failed(
                    "space_info",
                    &FileManagerError::storage("space_info", err),
                );
                None
            }
        };
    }

    /// Space is unknown or below the alarm threshold.
    pub fn is_storage_alarm(&self) -> bool {
        self.space_info
            .is_none_or(|info| info.free_percent() < STORAGE_ALARM_FREE_PERCENT)
    }

    /// Space info to display: only in the file manager when `Ready`, and only at the root
    /// or while the alarm is raised.
    pub fn storage_info(&self) -> Option<SpaceInfo> {
        if self.is_browse_mode() || self.state != LoadState::Ready {
            return None;
        }
        if self.is_storage_alarm() || self.is_root_directory() {
            self.space_info
        } else {
            None
        }
    }

    /// A file was changed by someone else (remote command, rename, delete).
    ///
    /// Reloads when either path lives in the displayed directory, otherwise just refreshes
    /// space info. Ignored while picking a file.
    pub fn on_storage_file_changed(&mut self, path: &str, other_path: Option<&str>) {
        if self.is_browse_mode() {
            return;
        }
        let shown = |p: &str| parent_dir(p) == self.current_dir;
        if shown(path) || other_path.is_some_and(shown) {
            self.load_directory();
            return;
        }
        self.refresh_storage_info();
    }

    /// Whether the session is picking a file rather than managing files.
    pub fn is_browse_mode(&self) -> bool {
        self.browse.is_some()
    }

    /// Title of the file picker.
    pub fn browse_title(&self) -> Option<&str> {
        self.browse.as_ref().map(|b| b.title.as_str())
    }

    /// File type the picker lists.
    pub fn browse_file_type(&self) -> Option<FileType> {
        self.browse.as_ref().map(|b| b.file_type)
    }

    /// Whether the picker also accepts new file names.
    pub fn is_save_dialog(&self) -> bool {
        self.browse
            .as_ref()
            .is_some_and(|b| b.dialog == DialogType::Save)
    }

    /// Whether a file has been picked and can be confirmed.
    pub fn has_pending_selection(&self) -> bool {
        self.selected_index.is_some()
    }

    /// Show a file picker for `file_type` starting in `start_dir`.
    pub fn browse_for_file(
        &mut self,
        title: &str,
        start_dir: &str,
        file_type: FileType,
        dialog: DialogType,
        on_selected: impl Fn(&str) + Send + Sync + 'static,
    ) {
        self.browse = Some(BrowseRequest {
            title: title.to_string(),
            file_type,
            dialog,
            on_selected: Arc::new(on_selected),
        });

        let dir = normalize_dir(start_dir);
        let max = self.preferences.max_path_length();
        if dir.len() > max {
            self.report(
                "browse",
                FileManagerError::PathTooLong {
                    len: dir.len(),
                    max,
                },
            );
            self.current_dir.clear();
        } else {
            self.current_dir = dir;
        }
        self.load_directory();
        self.ui.push_page(Page::FileBrowser);
    }

    /// Confirm the picked file: the picker closes and the callback gets its full path.
    pub fn confirm_browse_selection(&mut self) {
        self.ui.pop_page();
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let path = match self.entry_path(entry.name) {
            Ok(path) => path,
            Err(err) => return self.report("browse", err),
        };
        if let Some(browse) = &self.browse {
            let callback = Arc::clone(&browse.on_selected);
            self.outbox.push(Deferred::FileSelected(callback, path));
        }
    }

    /// Save dialogs only: close the picker and ask for a new file name.
    pub fn new_file(&mut self) {
        if !self.is_save_dialog() {
            return;
        }
        self.ui.pop_page();
        let max_len = self.preferences.max_path_length();
        self.ui.start_text_input(TextInputPurpose::NewFile, "", max_len);
    }

    /// Keypad answer to [`new_file`](Self::new_file). The file type's extension is appended
    /// unless already typed.
    pub fn on_new_file_input(&mut self, name: &str) {
        let Some(browse) = &self.browse else {
            return;
        };
        let mut extension = browse.file_type.default_extension();
        if ends_with_no_case(name, extension) {
            extension = "";
        }
        let callback = Arc::clone(&browse.on_selected);
        match self.entry_path(&format!("{name}{extension}")) {
            Ok(path) => self.outbox.push(Deferred::FileSelected(callback, path)),
            Err(err) => self.report("new_file", err),
        }
    }

    /// Leave the picker and show the full file manager.
    pub fn open_file_manager(&mut self) {
        self.browse = None;
        self.load_directory();
        self.ui.show_page(Page::FileManager);
    }

    /// Arena generation of the committed catalog.
    pub fn catalog_generation(&self) -> u64 {
        self.arena.generation()
    }
}

/// `"logs/"` -> `"/logs"`, `"/"` -> `""`.
fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(feature = "tracing")]
fn trace_load_requested(dir: &str, deferred: bool) {
    trace!(event = "load.requested", dir, deferred, "directory load requested");
}

#[cfg(not(feature = "tracing"))]
fn trace_load_requested(_dir: &str, _deferred: bool) {}

#[cfg(feature = "tracing")]
fn trace_load_completed(dir: &str, entries: usize, truncated: bool, duration_ms: u128) {
    debug!(
        event = "load.completed",
        dir, entries, truncated, duration_ms, "directory loaded"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_load_completed(_dir: &str, _entries: usize, _truncated: bool, _duration_ms: u128) {}

#[cfg(feature = "tracing")]
fn trace_load_failed(dir: &str, err: &FileManagerError) {
    warn!(event = "load.failed", dir, error = %err, "directory load failed");
}

#[cfg(not(feature = "tracing"))]
fn trace_load_failed(_dir: &str, _err: &FileManagerError) {}

#[cfg(feature = "tracing")]
fn trace_file_operation(op: &'static str, path: &str) {
    debug!(event = "file.operation", op, path, "file operation done");
}

#[cfg(not(feature = "tracing"))]
fn trace_file_operation(_op: &'static str, _path: &str) {}

#[cfg(feature = "tracing")]
fn trace_operation_failed(op: &'static str, err: &FileManagerError) {
    warn!(
        event = "file.operation_failed",
        op,
        scpi_code = err.scpi_code(),
        error = %err,
        "file operation failed"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_operation_failed(_op: &'static str, _err: &FileManagerError) {}
