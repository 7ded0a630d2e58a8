use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::{FileInfo, SpaceInfo, StorageDriver, compile_find_pattern, not_mounted};

#[derive(Clone, Debug)]
struct MemNode {
    is_dir: bool,
    fat_date: u16,
    fat_time: u16,
    data: Vec<u8>,
}

#[derive(Debug)]
struct MemVolume {
    nodes: BTreeMap<String, MemNode>,
    mounted: bool,
    capacity: u64,
    fail_listing: Option<io::ErrorKind>,
    fail_mutations: Option<io::ErrorKind>,
    listing_count: usize,
    mutation_count: usize,
}

/// In-memory FAT volume for simulation and tests.
///
/// Clones share the same volume, so a test can keep a handle while the file manager owns the
/// driver. Listings can be made to fail, and listing/mutation calls are counted.
#[derive(Clone, Debug)]
pub struct MemStorage {
    volume: Arc<Mutex<MemVolume>>,
    cursor: VecDeque<FileInfo>,
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// `"a//b/"` -> `"/a/b"`, root -> `""`.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for c in path.split('/').filter(|c| !c.is_empty()) {
        out.push('/');
        out.push_str(c);
    }
    out
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

fn base_name(path: &str) -> &str {
    path.rfind('/').map(|i| &path[i + 1..]).unwrap_or(path)
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}"))
}

impl MemStorage {
    /// Default capacity reported by [`StorageDriver::space_info`].
    pub const DEFAULT_CAPACITY: u64 = 64 * 1024 * 1024;

    /// An empty, mounted volume.
    pub fn new() -> Self {
        Self {
            volume: Arc::new(Mutex::new(MemVolume {
                nodes: BTreeMap::new(),
                mounted: true,
                capacity: Self::DEFAULT_CAPACITY,
                fail_listing: None,
                fail_mutations: None,
                listing_count: 0,
                mutation_count: 0,
            })),
            cursor: VecDeque::new(),
        }
    }

    /// Add (or replace) a file of `size` zero bytes. Missing parent directories are created.
    pub fn insert_file(&self, path: &str, size: usize, fat_date: u16, fat_time: u16) {
        self.insert_file_with_data(path, vec![0; size], fat_date, fat_time);
    }

    /// Add (or replace) a file with the given contents.
    pub fn insert_file_with_data(&self, path: &str, data: Vec<u8>, fat_date: u16, fat_time: u16) {
        let path = normalize(path);
        let mut volume = self.volume.lock();
        insert_parents(&mut volume.nodes, &path);
        volume.nodes.insert(
            path,
            MemNode {
                is_dir: false,
                fat_date,
                fat_time,
                data,
            },
        );
    }

    /// Add a directory (and its parents).
    pub fn insert_dir(&self, path: &str) {
        let path = normalize(path);
        let mut volume = self.volume.lock();
        insert_parents(&mut volume.nodes, &path);
        volume.nodes.entry(path).or_insert_with(dir_node);
    }

    /// Whether `path` exists.
    pub fn contains(&self, path: &str) -> bool {
        self.volume.lock().nodes.contains_key(&normalize(path))
    }

    /// Simulate card insertion/removal.
    pub fn set_mounted(&self, mounted: bool) {
        self.volume.lock().mounted = mounted;
    }

    /// Set the capacity used for space info.
    pub fn set_capacity(&self, bytes: u64) {
        self.volume.lock().capacity = bytes;
    }

    /// Make every directory listing fail with `kind` (or succeed again with `None`).
    pub fn fail_listing(&self, kind: Option<io::ErrorKind>) {
        self.volume.lock().fail_listing = kind;
    }

    /// Make rename/remove/make_dir fail with `kind` (or succeed again with `None`).
    pub fn fail_mutations(&self, kind: Option<io::ErrorKind>) {
        self.volume.lock().fail_mutations = kind;
    }

    /// Number of `find_first` calls so far.
    pub fn listing_count(&self) -> usize {
        self.volume.lock().listing_count
    }

    /// Number of rename/remove/make_dir calls so far, failed ones included.
    pub fn mutation_count(&self) -> usize {
        self.volume.lock().mutation_count
    }

    fn begin_mutation(&self) -> io::Result<parking_lot::MutexGuard<'_, MemVolume>> {
        let mut volume = self.volume.lock();
        volume.mutation_count += 1;
        if !volume.mounted {
            return Err(not_mounted());
        }
        if let Some(kind) = volume.fail_mutations {
            return Err(io::Error::new(kind, "injected failure"));
        }
        Ok(volume)
    }
}

fn dir_node() -> MemNode {
    MemNode {
        is_dir: true,
        fat_date: 0,
        fat_time: 0,
        data: Vec::new(),
    }
}

fn insert_parents(nodes: &mut BTreeMap<String, MemNode>, path: &str) {
    let mut parent = parent_of(path);
    while !parent.is_empty() {
        nodes.entry(parent.to_string()).or_insert_with(dir_node);
        parent = parent_of(parent);
    }
}

fn info(path: &str, node: &MemNode) -> FileInfo {
    FileInfo {
        name: base_name(path).to_string(),
        is_dir: node.is_dir,
        size: if node.is_dir {
            0
        } else {
            u32::try_from(node.data.len()).unwrap_or(u32::MAX)
        },
        fat_date: node.fat_date,
        fat_time: node.fat_time,
    }
}

impl StorageDriver for MemStorage {
    fn mount(&mut self) -> io::Result<()> {
        self.volume.lock().mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.volume.lock().mounted = false;
        self.cursor.clear();
    }

    fn is_mounted(&self) -> bool {
        self.volume.lock().mounted
    }

    fn stat(&mut self, path: &str) -> io::Result<FileInfo> {
        let volume = self.volume.lock();
        if !volume.mounted {
            return Err(not_mounted());
        }
        let path = normalize(path);
        volume
            .nodes
            .get(&path)
            .map(|node| info(&path, node))
            .ok_or_else(|| not_found(&path))
    }

    fn find_first(&mut self, dir: &str, pattern: &str) -> io::Result<Option<FileInfo>> {
        let matcher = compile_find_pattern(pattern)?;
        let dir = normalize(dir);
        let mut volume = self.volume.lock();
        volume.listing_count += 1;
        if !volume.mounted {
            return Err(not_mounted());
        }
        if let Some(kind) = volume.fail_listing {
            return Err(io::Error::new(kind, "injected failure"));
        }
        if !dir.is_empty() && !volume.nodes.get(&dir).is_some_and(|n| n.is_dir) {
            return Err(not_found(&dir));
        }
        self.cursor = volume
            .nodes
            .iter()
            .filter(|(path, _)| parent_of(path) == dir)
            .filter(|(path, _)| matcher.is_match(base_name(path)))
            .map(|(path, node)| info(path, node))
            .collect();
        Ok(self.cursor.pop_front())
    }

    fn find_next(&mut self) -> io::Result<Option<FileInfo>> {
        if !self.volume.lock().mounted {
            return Err(not_mounted());
        }
        Ok(self.cursor.pop_front())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        let (from, to) = (normalize(from), normalize(to));
        let mut volume = self.begin_mutation()?;
        if !volume.nodes.contains_key(&from) {
            return Err(not_found(&from));
        }
        if volume.nodes.contains_key(&to) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "destination exists"));
        }
        let prefix = format!("{from}/");
        let moved: Vec<String> = volume
            .nodes
            .keys()
            .filter(|k| **k == from || k.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = volume.nodes.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                volume.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn remove(&mut self, path: &str) -> io::Result<()> {
        let path = normalize(path);
        let mut volume = self.begin_mutation()?;
        let is_dir = match volume.nodes.get(&path) {
            Some(node) => node.is_dir,
            None => return Err(not_found(&path)),
        };
        if is_dir && volume.nodes.keys().any(|k| parent_of(k) == path) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                "directory not empty",
            ));
        }
        volume.nodes.remove(&path);
        Ok(())
    }

    fn make_dir(&mut self, path: &str) -> io::Result<()> {
        let path = normalize(path);
        let mut volume = self.begin_mutation()?;
        if volume.nodes.contains_key(&path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "already exists"));
        }
        let parent = parent_of(&path);
        if !parent.is_empty() && !volume.nodes.get(parent).is_some_and(|n| n.is_dir) {
            return Err(not_found(parent));
        }
        volume.nodes.insert(path, dir_node());
        Ok(())
    }

    fn read_file(&mut self, path: &str) -> io::Result<Vec<u8>> {
        let volume = self.volume.lock();
        if !volume.mounted {
            return Err(not_mounted());
        }
        let path = normalize(path);
        match volume.nodes.get(&path) {
            Some(node) if !node.is_dir => Ok(node.data.clone()),
            Some(_) => Err(io::Error::new(io::ErrorKind::IsADirectory, "is a directory")),
            None => Err(not_found(&path)),
        }
    }

    fn space_info(&mut self) -> io::Result<SpaceInfo> {
        let volume = self.volume.lock();
        if !volume.mounted {
            return Err(not_mounted());
        }
        let used: u64 = volume.nodes.values().map(|n| n.data.len() as u64).sum();
        Ok(SpaceInfo {
            used,
            free: volume.capacity.saturating_sub(used),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(storage: &mut MemStorage, dir: &str, pattern: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut next = storage.find_first(dir, pattern).unwrap();
        while let Some(info) = next {
            out.push(info.name);
            next = storage.find_next().unwrap();
        }
        out
    }

    #[test]
    fn lists_direct_children_only() {
        let mut storage = MemStorage::new();
        storage.insert_file("/logs/a.dlog", 10, 0, 0);
        storage.insert_file("/logs/deep/b.dlog", 10, 0, 0);
        storage.insert_file("/top.txt", 1, 0, 0);
        assert_eq!(list(&mut storage, "", "*"), vec!["logs", "top.txt"]);
        assert_eq!(list(&mut storage, "/logs", "*"), vec!["a.dlog", "deep"]);
        assert_eq!(list(&mut storage, "/logs", "*.DLOG"), vec!["a.dlog"]);
        assert_eq!(storage.listing_count(), 3);
    }

    #[test]
    fn rename_moves_subtree() {
        let mut storage = MemStorage::new();
        storage.insert_file("/old/x.py", 3, 0, 0);
        storage.rename("/old", "/new").unwrap();
        assert!(storage.contains("/new/x.py"));
        assert!(!storage.contains("/old"));
        let err = storage.rename("/missing", "/other").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(storage.mutation_count(), 2);
    }

    #[test]
    fn remove_refuses_non_empty_directory() {
        let mut storage = MemStorage::new();
        storage.insert_file("/d/f", 1, 0, 0);
        assert_eq!(
            storage.remove("/d").unwrap_err().kind(),
            io::ErrorKind::DirectoryNotEmpty
        );
        storage.remove("/d/f").unwrap();
        storage.remove("/d").unwrap();
        assert!(!storage.contains("/d"));
    }

    #[test]
    fn unmounted_volume_and_injected_failures() {
        let mut storage = MemStorage::new();
        storage.insert_file("/a", 1, 0, 0);
        storage.set_mounted(false);
        assert_eq!(
            storage.find_first("", "*").unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        storage.set_mounted(true);
        storage.fail_listing(Some(io::ErrorKind::Other));
        assert!(storage.find_first("", "*").is_err());
        storage.fail_listing(None);
        assert_eq!(list(&mut storage, "", "*"), vec!["a"]);
    }

    #[test]
    fn space_info_counts_file_bytes() {
        let mut storage = MemStorage::new();
        storage.set_capacity(100);
        storage.insert_file("/a", 30, 0, 0);
        storage.insert_file("/b/c", 20, 0, 0);
        assert_eq!(storage.space_info().unwrap(), SpaceInfo { used: 50, free: 50 });
    }
}
