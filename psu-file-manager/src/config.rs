use std::time::Duration;

/// Default arena size in bytes.
pub const DEFAULT_ARENA_BYTES: usize = 32 * 1024;
/// Rows per page while picking a file.
pub const DEFAULT_BROWSE_PAGE_SIZE: usize = 5;
/// Rows per page in the full file manager.
pub const DEFAULT_MANAGE_PAGE_SIZE: usize = 6;
/// How long a fresh load keeps reporting `Starting`.
pub const DEFAULT_STARTING_DWELL: Duration = Duration::from_secs(1);

/// Configuration for [`FileManager`](crate::FileManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileManagerConfig {
    /// Capacity of the catalog arena in bytes (records + names).
    pub arena_bytes: usize,
    /// Page size in browse (file picker) mode.
    pub browse_page_size: usize,
    /// Page size in manage mode.
    pub manage_page_size: usize,
    /// Elapsed load time during which `state()` still reports `Starting`.
    pub starting_dwell: Duration,
    /// Depth of the request queue towards the filesystem owner thread.
    pub queue_capacity: usize,
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        Self {
            arena_bytes: DEFAULT_ARENA_BYTES,
            browse_page_size: DEFAULT_BROWSE_PAGE_SIZE,
            manage_page_size: DEFAULT_MANAGE_PAGE_SIZE,
            starting_dwell: DEFAULT_STARTING_DWELL,
            queue_capacity: 10,
        }
    }
}

impl FileManagerConfig {
    /// Set the arena capacity in bytes.
    pub fn with_arena_bytes(mut self, bytes: usize) -> Self {
        self.arena_bytes = bytes;
        self
    }

    /// Set both page sizes.
    pub fn with_page_sizes(mut self, browse: usize, manage: usize) -> Self {
        self.browse_page_size = browse.max(1);
        self.manage_page_size = manage.max(1);
        self
    }

    /// Set the `Starting` dwell.
    pub fn with_starting_dwell(mut self, dwell: Duration) -> Self {
        self.starting_dwell = dwell;
        self
    }

    /// Set the request queue depth.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub(crate) fn page_size(&self, browse_mode: bool) -> usize {
        if browse_mode {
            self.browse_page_size
        } else {
            self.manage_page_size
        }
    }
}
