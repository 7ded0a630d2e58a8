use crate::arena::EntryArena;
use crate::core::FileType;
use crate::error::{FileManagerError, Result};
use crate::storage::{FileInfo, StorageDriver};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Find pattern used for every catalog listing.
pub const LIST_ALL_PATTERN: &str = "*";

/// Outcome of one catalog build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Committed entries.
    pub count: usize,
    /// The arena filled up before the listing ended.
    pub truncated: bool,
}

fn classify(info: &FileInfo) -> FileType {
    if info.is_dir {
        FileType::Directory
    } else {
        FileType::from_file_name(&info.name)
    }
}

/// Reset `arena` and fill it with the entries of `dir`.
///
/// With `filter` set, only files of that type are kept; directories always pass. A full arena
/// ends the listing early with `truncated` set. Driver failures are returned as
/// [`FileManagerError::Storage`]; the arena then holds whatever was committed before.
pub fn build_catalog(
    storage: &mut dyn StorageDriver,
    arena: &mut EntryArena,
    dir: &str,
    filter: Option<FileType>,
) -> Result<CatalogStats> {
    arena.reset();
    if !storage.is_mounted() {
        return Err(FileManagerError::NotPresent);
    }

    let mut stats = CatalogStats::default();
    let mut next = storage
        .find_first(dir, LIST_ALL_PATTERN)
        .map_err(|e| FileManagerError::storage("catalog", e))?;

    while let Some(info) = next {
        if !info.name.is_empty() && info.name != "." && info.name != ".." {
            let kind = classify(&info);
            let accepted = kind == FileType::Directory || filter.is_none_or(|f| f == kind);
            if accepted {
                let size = if kind == FileType::Directory { 0 } else { info.size };
                if arena
                    .push(kind, &info.name, size, info.modified_timestamp())
                    .is_none()
                {
                    stats.truncated = true;
                    trace_catalog_truncated(dir, arena.len());
                    break;
                }
            }
        }
        next = storage
            .find_next()
            .map_err(|e| FileManagerError::storage("catalog", e))?;
    }

    stats.count = arena.len();
    trace_catalog_completed(dir, stats.count, arena.used_bytes());
    Ok(stats)
}

#[cfg(feature = "tracing")]
fn trace_catalog_completed(dir: &str, entries: usize, used_bytes: usize) {
    trace!(
        event = "catalog.completed",
        dir, entries, used_bytes, "catalog built"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_catalog_completed(_dir: &str, _entries: usize, _used_bytes: usize) {}

#[cfg(feature = "tracing")]
fn trace_catalog_truncated(dir: &str, kept: usize) {
    debug!(
        event = "catalog.truncated",
        dir, kept, "catalog arena full, listing truncated"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_catalog_truncated(_dir: &str, _kept: usize) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_storage::MemStorage;

    fn names(arena: &EntryArena) -> Vec<&str> {
        arena.iter().map(|e| e.name).collect()
    }

    fn sample() -> MemStorage {
        let storage = MemStorage::new();
        storage.insert_dir("/logs");
        storage.insert_file("/run.dlog", 40, 0, 0);
        storage.insert_file("/shot.PNG", 20, 0, 0);
        storage.insert_file("/ramp.py", 10, 0, 0);
        storage.insert_file("/notes.txt", 5, 0, 0);
        storage
    }

    #[test]
    fn classifies_entries() {
        let mut storage = sample();
        let mut arena = EntryArena::with_capacity(1024);
        let stats = build_catalog(&mut storage, &mut arena, "", None).unwrap();
        assert_eq!(stats, CatalogStats { count: 5, truncated: false });
        let kinds: Vec<_> = arena.iter().map(|e| (e.name, e.kind)).collect();
        assert_eq!(
            kinds,
            [
                ("logs", FileType::Directory),
                ("notes.txt", FileType::Other),
                ("ramp.py", FileType::Script),
                ("run.dlog", FileType::DataLog),
                ("shot.PNG", FileType::Image),
            ]
        );
        assert_eq!(arena.entry(0).unwrap().size, 0);
    }

    #[test]
    fn filter_keeps_directories() {
        let mut storage = sample();
        let mut arena = EntryArena::with_capacity(1024);
        let stats = build_catalog(&mut storage, &mut arena, "", Some(FileType::Script)).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(names(&arena), ["logs", "ramp.py"]);
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let mut storage = sample();
        let mut arena = EntryArena::with_capacity(1024);
        let stats = build_catalog(&mut storage, &mut arena, "/logs", None).unwrap();
        assert_eq!(stats, CatalogStats::default());
    }

    #[test]
    fn full_arena_truncates_without_failing() {
        let mut storage = sample();
        // Two records of 16 bytes plus two short names.
        let mut arena = EntryArena::with_capacity(2 * 16 + 24);
        let stats = build_catalog(&mut storage, &mut arena, "", None).unwrap();
        assert!(stats.truncated);
        assert_eq!(stats.count, arena.len());
        assert_eq!(names(&arena), ["logs", "notes.txt"]);
    }

    #[test]
    fn driver_errors_are_reported() {
        let mut storage = sample();
        let mut arena = EntryArena::with_capacity(1024);
        storage.fail_listing(Some(std::io::ErrorKind::Other));
        let err = build_catalog(&mut storage, &mut arena, "", None).unwrap_err();
        assert!(matches!(err, FileManagerError::Storage { op: "catalog", .. }));

        storage.set_mounted(false);
        let err = build_catalog(&mut storage, &mut arena, "", None).unwrap_err();
        assert!(matches!(err, FileManagerError::NotPresent));
    }

    #[test]
    fn missing_directory_is_a_storage_error() {
        let mut storage = sample();
        let mut arena = EntryArena::with_capacity(1024);
        let err = build_catalog(&mut storage, &mut arena, "/nope", None).unwrap_err();
        assert_eq!(err.scpi_code(), crate::error::SCPI_ERROR_FILE_NAME_NOT_FOUND);
    }
}
