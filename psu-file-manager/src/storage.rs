use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

use crate::fat;

/// Directory entry returned by [`StorageDriver::find_first`] / [`StorageDriver::find_next`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name (no parent path).
    pub name: String,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// File size in bytes.
    pub size: u32,
    /// FAT modification date field.
    pub fat_date: u16,
    /// FAT modification time field.
    pub fat_time: u16,
}

impl FileInfo {
    /// Modification timestamp (seconds resolution) derived from the FAT fields.
    pub fn modified_timestamp(&self) -> u32 {
        fat::fat_to_timestamp(self.fat_date, self.fat_time)
    }
}

/// Used/free space of a mounted volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpaceInfo {
    /// Bytes in use.
    pub used: u64,
    /// Bytes available.
    pub free: u64,
}

impl SpaceInfo {
    /// Total volume size.
    pub fn total(&self) -> u64 {
        self.used.saturating_add(self.free)
    }

    /// Free space in whole percent (rounded down); 0 for an empty volume.
    pub fn free_percent(&self) -> u64 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (u128::from(self.free) * 100 / u128::from(total)) as u64
    }
}

/// FAT volume driver consumed by the file manager.
///
/// Paths are volume paths: components separated by `/`, the root is `""` (or `"/"`).
/// Every method is only ever called from the filesystem owner thread.
pub trait StorageDriver: Send {
    /// Mount the volume.
    fn mount(&mut self) -> io::Result<()>;
    /// Unmount the volume.
    fn unmount(&mut self);
    /// Whether the volume is mounted.
    fn is_mounted(&self) -> bool;
    /// Metadata of a single path.
    fn stat(&mut self, path: &str) -> io::Result<FileInfo>;
    /// Start iterating `dir` with a FAT-style pattern (`*`, `?`).
    ///
    /// Returns the first match, or `None` for an empty listing.
    fn find_first(&mut self, dir: &str, pattern: &str) -> io::Result<Option<FileInfo>>;
    /// Next match of the listing started by [`find_first`](Self::find_first).
    fn find_next(&mut self) -> io::Result<Option<FileInfo>>;
    /// Rename/move a file or directory.
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;
    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> io::Result<()>;
    /// Create a directory.
    fn make_dir(&mut self, path: &str) -> io::Result<()>;
    /// Read a whole file.
    fn read_file(&mut self, path: &str) -> io::Result<Vec<u8>>;
    /// Used/free space query.
    fn space_info(&mut self) -> io::Result<SpaceInfo>;
}

/// Compile a FAT find pattern (`*` any run, `?` one character) into a case-insensitive matcher.
pub(crate) fn compile_find_pattern(pattern: &str) -> io::Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

pub(crate) fn not_mounted() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "volume not mounted")
}

/// Volume backed by a host directory (simulator builds).
///
/// Volume paths are resolved below `root`; `.`/`..` components are ignored. Space info is
/// reported against a configured capacity.
#[derive(Debug)]
pub struct StdStorage {
    root: PathBuf,
    mounted: bool,
    capacity: u64,
    cursor: VecDeque<FileInfo>,
}

impl StdStorage {
    /// Default capacity reported by [`StorageDriver::space_info`].
    pub const DEFAULT_CAPACITY: u64 = 4 * 1024 * 1024 * 1024;

    /// Create an unmounted volume rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
            capacity: Self::DEFAULT_CAPACITY,
            cursor: VecDeque::new(),
        }
    }

    /// Set the capacity used for space info.
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Host directory backing the volume.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &str) -> PathBuf {
        let mut out = self.root.clone();
        for c in path.split(['/', '\\']) {
            if c.is_empty() || c == "." || c == ".." {
                continue;
            }
            out.push(c);
        }
        out
    }

    fn check_mounted(&self) -> io::Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(not_mounted())
        }
    }
}

fn file_info_from_metadata(name: String, md: &std::fs::Metadata) -> FileInfo {
    let (fat_date, fat_time) = md
        .modified()
        .ok()
        .map(|t| fat::datetime_to_fat(&chrono::DateTime::<chrono::Local>::from(t).naive_local()))
        .unwrap_or((0, 0));
    let is_dir = md.is_dir();
    FileInfo {
        name,
        is_dir,
        size: if is_dir {
            0
        } else {
            u32::try_from(md.len()).unwrap_or(u32::MAX)
        },
        fat_date,
        fat_time,
    }
}

fn dir_usage(dir: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    for e in std::fs::read_dir(dir)? {
        let Ok(e) = e else { continue };
        let Ok(md) = e.metadata() else { continue };
        if md.is_dir() {
            total = total.saturating_add(dir_usage(&e.path())?);
        } else {
            total = total.saturating_add(md.len());
        }
    }
    Ok(total)
}

impl StorageDriver for StdStorage {
    fn mount(&mut self) -> io::Result<()> {
        let md = std::fs::metadata(&self.root)?;
        if !md.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "volume root is not a directory",
            ));
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.mounted = false;
        self.cursor.clear();
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn stat(&mut self, path: &str) -> io::Result<FileInfo> {
        self.check_mounted()?;
        let host = self.host_path(path);
        let md = std::fs::metadata(&host)?;
        let name = host
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(file_info_from_metadata(name, &md))
    }

    fn find_first(&mut self, dir: &str, pattern: &str) -> io::Result<Option<FileInfo>> {
        self.check_mounted()?;
        let matcher = compile_find_pattern(pattern)?;
        self.cursor.clear();
        for e in std::fs::read_dir(self.host_path(dir))? {
            let e = match e {
                Ok(v) => v,
                Err(_) => continue,
            };
            let md = match e.metadata() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let name = e.file_name().to_string_lossy().to_string();
            if !matcher.is_match(&name) {
                continue;
            }
            self.cursor.push_back(file_info_from_metadata(name, &md));
        }
        Ok(self.cursor.pop_front())
    }

    fn find_next(&mut self) -> io::Result<Option<FileInfo>> {
        self.check_mounted()?;
        Ok(self.cursor.pop_front())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        self.check_mounted()?;
        let to = self.host_path(to);
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists",
            ));
        }
        std::fs::rename(self.host_path(from), to)
    }

    fn remove(&mut self, path: &str) -> io::Result<()> {
        self.check_mounted()?;
        let host = self.host_path(path);
        if std::fs::metadata(&host)?.is_dir() {
            std::fs::remove_dir(host)
        } else {
            std::fs::remove_file(host)
        }
    }

    fn make_dir(&mut self, path: &str) -> io::Result<()> {
        self.check_mounted()?;
        std::fs::create_dir(self.host_path(path))
    }

    fn read_file(&mut self, path: &str) -> io::Result<Vec<u8>> {
        self.check_mounted()?;
        std::fs::read(self.host_path(path))
    }

    fn space_info(&mut self) -> io::Result<SpaceInfo> {
        self.check_mounted()?;
        let used = dir_usage(&self.root)?;
        Ok(SpaceInfo {
            used,
            free: self.capacity.saturating_sub(used),
        })
    }
}
