//! Collaborators provided by the embedding firmware: GUI page stack, persisted settings and
//! per-type file actions.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::SortOrder;
use crate::error::FileManagerError;

/// Maximum volume path length when the preferences do not override it.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 255;

/// Pages the file manager shows or pushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    /// Full file manager list.
    FileManager,
    /// File picker list.
    FileBrowser,
    /// Context menu for the selected file.
    FileMenu,
    /// Image viewer.
    ImageView,
    /// Data-log viewer.
    DlogView,
}

/// Why a text input was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextInputPurpose {
    /// Answer with [`FileManagerSession::on_rename_input`](crate::FileManagerSession::on_rename_input).
    Rename,
    /// Answer with [`FileManagerSession::on_new_file_input`](crate::FileManagerSession::on_new_file_input).
    NewFile,
}

/// GUI framework seam.
pub trait UiHost: Send {
    /// Replace the page stack with `page`.
    fn show_page(&mut self, page: Page);
    /// Push `page` on top of the stack.
    fn push_page(&mut self, page: Page);
    /// Pop the topmost page.
    fn pop_page(&mut self);
    /// Whether `page` is anywhere on the stack.
    fn is_page_on_stack(&self, page: Page) -> bool;
    /// Show an error message.
    fn show_error(&mut self, error: &FileManagerError);
    /// Show the "operation in progress" modal. The host keeps polling
    /// [`FileManagerSession::poll_image_loading`](crate::FileManagerSession::poll_image_loading).
    fn show_async_operation(&mut self, label: &str);
    /// Open the keypad with `initial` text, at most `max_len` bytes.
    fn start_text_input(&mut self, purpose: TextInputPurpose, initial: &str, max_len: usize);
}

/// Persisted settings seam.
pub trait Preferences: Send {
    /// Stored sort order.
    fn sort_order(&self) -> SortOrder;
    /// Persist a new sort order.
    fn set_sort_order(&mut self, order: SortOrder);
    /// Maximum length of a volume path.
    fn max_path_length(&self) -> usize {
        DEFAULT_MAX_PATH_LENGTH
    }
}

/// What happens when a file is opened, plus the remote upload link.
pub trait FileActions: Send {
    /// Open a data log in the viewer.
    fn open_data_log(&mut self, path: &str);
    /// Whether a new script may be started.
    fn is_script_engine_idle(&self) -> bool;
    /// Start a script.
    fn start_script(&mut self, path: &str);
    /// Whether a serial or network client is connected.
    fn is_upload_link_connected(&self) -> bool;
    /// Send a file to the connected client.
    fn upload(&mut self, path: &str) -> io::Result<()>;
}

/// In-memory [`Preferences`].
#[derive(Clone, Debug)]
pub struct MemoryPreferences {
    /// Current sort order.
    pub sort_order: SortOrder,
    /// Path length limit.
    pub max_path_length: usize,
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default(),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl Preferences for MemoryPreferences {
    fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
    }

    fn max_path_length(&self) -> usize {
        self.max_path_length
    }
}

/// Everything a [`HeadlessUi`] has been asked to do.
#[derive(Clone, Debug, Default)]
pub struct HeadlessUiState {
    /// Current page stack, bottom first.
    pub pages: Vec<Page>,
    /// Errors shown, as display strings.
    pub errors: Vec<String>,
    /// Async-operation labels shown.
    pub async_operations: Vec<String>,
    /// Text inputs started: purpose, initial text, maximum length.
    pub text_inputs: Vec<(TextInputPurpose, String, usize)>,
}

/// [`UiHost`] without a screen: records every call. Clones share the record.
#[derive(Clone, Debug, Default)]
pub struct HeadlessUi {
    state: Arc<Mutex<HeadlessUiState>>,
}

impl HeadlessUi {
    /// Copy of the recorded state.
    pub fn snapshot(&self) -> HeadlessUiState {
        self.state.lock().clone()
    }

    /// Topmost page.
    pub fn top_page(&self) -> Option<Page> {
        self.state.lock().pages.last().copied()
    }
}

impl UiHost for HeadlessUi {
    fn show_page(&mut self, page: Page) {
        let mut state = self.state.lock();
        state.pages.clear();
        state.pages.push(page);
    }

    fn push_page(&mut self, page: Page) {
        self.state.lock().pages.push(page);
    }

    fn pop_page(&mut self) {
        self.state.lock().pages.pop();
    }

    fn is_page_on_stack(&self, page: Page) -> bool {
        self.state.lock().pages.contains(&page)
    }

    fn show_error(&mut self, error: &FileManagerError) {
        self.state.lock().errors.push(error.to_string());
    }

    fn show_async_operation(&mut self, label: &str) {
        self.state.lock().async_operations.push(label.to_string());
    }

    fn start_text_input(&mut self, purpose: TextInputPurpose, initial: &str, max_len: usize) {
        self.state
            .lock()
            .text_inputs
            .push((purpose, initial.to_string(), max_len));
    }
}

/// [`FileActions`] for builds without viewers or a remote link: scripts never start and
/// uploads are refused.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFileActions;

impl FileActions for NoFileActions {
    fn open_data_log(&mut self, _path: &str) {}

    fn is_script_engine_idle(&self) -> bool {
        false
    }

    fn start_script(&mut self, _path: &str) {}

    fn is_upload_link_connected(&self) -> bool {
        false
    }

    fn upload(&mut self, _path: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "no upload link",
        ))
    }
}
