#![deny(missing_docs)]
//! SD-card file manager core for a bench power supply.
//!
//! A directory is scanned into a fixed-size [`EntryArena`] (records grow from the front,
//! names from the back), sorted in place and served page by page to the GUI through a
//! [`FileManagerSession`]. Only one thread, the filesystem owner, ever talks to the
//! [`StorageDriver`]; calls from other threads are turned into [`FsRequest`]s and queued.
//!
//! ```no_run
//! use psu_file_manager::{FileManagerBuilder, LoadState, MemStorage};
//!
//! let storage = MemStorage::new();
//! storage.insert_file("/logs/run1.dlog", 1024, 0, 0);
//!
//! let (manager, owner) = FileManagerBuilder::new(storage).spawn()?;
//! while manager.lock().state() != LoadState::Ready {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! let session = manager.lock();
//! for row in session.scroll_start()..session.entry_count() {
//!     println!("{}", session.name(row));
//! }
//! drop(session);
//! owner.shutdown().ok();
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! Features:
//! - `tracing` (default): structured events for loads, requests and failed operations
//! - `image`: JPEG/PNG decoding for the image viewer via the `image` crate

mod arena;
mod catalog;
mod config;
mod core;
mod dispatch;
mod error;
mod fat;
mod host;
mod image_decode;
mod manager;
mod mem_storage;
mod session;
mod sort;
mod storage;

pub use arena::{CatalogEntry, EntryArena, EntryHandle, EntryRecord, NameRef, RECORD_BYTES};
pub use catalog::{CatalogStats, LIST_ALL_PATTERN, build_catalog};
pub use config::{
    DEFAULT_ARENA_BYTES, DEFAULT_BROWSE_PAGE_SIZE, DEFAULT_MANAGE_PAGE_SIZE,
    DEFAULT_STARTING_DWELL, FileManagerConfig,
};
pub use core::{DialogType, FileType, LoadState, SortKey, SortOrder};
pub use dispatch::{DispatchGate, FsRequest, RequestQueue, channel};
pub use error::{
    FileManagerError, Result, SCPI_ERROR_FILE_NAME_ERROR, SCPI_ERROR_FILE_NAME_NOT_FOUND,
    SCPI_ERROR_MASS_STORAGE_ERROR, SCPI_ERROR_MISSING_MASS_MEDIA,
};
pub use fat::{FAT_EPOCH_YEAR, datetime_to_fat, fat_to_datetime, fat_to_timestamp};
pub use host::{
    DEFAULT_MAX_PATH_LENGTH, FileActions, HeadlessUi, HeadlessUiState, MemoryPreferences,
    NoFileActions, Page, Preferences, TextInputPurpose, UiHost,
};
#[cfg(feature = "image")]
pub use image_decode::ImageCrateDecoder;
pub use image_decode::{
    DEFAULT_VIEW_SIZE, DecodedImage, ImageDecoder, UnsupportedImageDecoder, default_decoder,
};
pub use manager::{FileManager, FileManagerBuilder, OWNER_THREAD_NAME, OwnerThread, SessionGuard};
pub use mem_storage::MemStorage;
pub use session::{
    FileManagerSession, FileSelectedCallback, IMAGE_LOADING_LABEL, ImageLoadStatus,
    ROOT_DIRECTORY_LABEL, STORAGE_ALARM_FREE_PERCENT,
};
pub use sort::{compare, full_compare, sort_catalog};
pub use storage::{FileInfo, SpaceInfo, StdStorage, StorageDriver};
