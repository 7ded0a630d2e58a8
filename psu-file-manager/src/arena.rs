//! Fixed-capacity catalog arena.
//!
//! One word-aligned buffer holds two regions that grow towards each other:
//!
//! ```text
//! [ rec 0 | rec 1 | ... | rec n-1 ]  ->   free   <-  [ name n-1\0.. | ... | name 0\0.. ]
//! 0                          front                 back                           capacity
//! ```
//!
//! Records are fixed 16-byte [`EntryRecord`]s. Names are NUL-terminated and padded to a
//! 4-byte boundary. Records refer to their name by byte offset + length, so sorting the
//! record region never moves name bytes. There is no per-entry free: `reset` rewinds both
//! cursors and bumps the generation, which invalidates every [`EntryHandle`] at once.

use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};

use crate::core::FileType;

const WORD_BYTES: usize = std::mem::size_of::<u32>();
const RECORD_WORDS: usize = std::mem::size_of::<EntryRecord>() / WORD_BYTES;

/// Size of one record slot in bytes.
pub const RECORD_BYTES: usize = std::mem::size_of::<EntryRecord>();

/// Fixed-size record stored in the forward region.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct EntryRecord {
    size: u32,
    modified: u32,
    name_offset: u32,
    name_len: u16,
    kind: u8,
    _pad: u8,
}

/// Location of a name inside the backward region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameRef {
    offset: u32,
    len: u16,
}

/// Borrowed view of one committed catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    /// Classified type.
    pub kind: FileType,
    /// File name, borrowed from the arena.
    pub name: &'a str,
    /// Size in bytes (0 for directories).
    pub size: u32,
    /// Modification timestamp, seconds resolution.
    pub modified: u32,
}

impl CatalogEntry<'_> {
    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }
}

/// Reference to one committed entry, tagged with the generation it was taken from.
///
/// The handle follows its entry through an in-place re-sort and stops resolving after a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    generation: u64,
    index: u32,
    name_offset: u32,
}

impl EntryHandle {
    /// Position of the entry at the time the handle was taken.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Dual-growth bump allocator for one directory catalog.
#[derive(Debug)]
pub struct EntryArena {
    words: Box<[u32]>,
    len: usize,
    back: usize,
    generation: u64,
}

impl EntryArena {
    /// Allocate an arena of `capacity_bytes` (rounded down to whole words).
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        let words = vec![0u32; capacity_bytes / WORD_BYTES].into_boxed_slice();
        let back = words.len();
        Self {
            words,
            len: 0,
            back,
            generation: 0,
        }
    }

    /// Rewind both cursors. Bytes are not cleared.
    pub fn reset(&mut self) {
        self.len = 0;
        self.back = self.words.len();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no record is committed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bumped on every [`reset`](Self::reset).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    /// Bytes taken by records and names together.
    pub fn used_bytes(&self) -> usize {
        (self.front() + self.words.len() - self.back) * WORD_BYTES
    }

    fn front(&self) -> usize {
        self.len * RECORD_WORDS
    }

    /// Reserve the next record slot. `None` (and no change) if it would cross the name region.
    pub fn append_entry(&mut self, kind: FileType, size: u32, modified: u32) -> Option<usize> {
        let index = self.len;
        let front_end = self.front() + RECORD_WORDS;
        if front_end > self.back {
            return None;
        }
        let records: &mut [EntryRecord] = bytemuck::cast_slice_mut(&mut self.words[..front_end]);
        records[index] = EntryRecord {
            size,
            modified,
            name_offset: 0,
            name_len: 0,
            kind: kind as u8,
            _pad: 0,
        };
        self.len += 1;
        Some(index)
    }

    /// Copy `name` plus a NUL terminator below the name region. `None` (and no change) if the
    /// padded slot would cross the record region.
    pub fn append_name(&mut self, name: &str) -> Option<NameRef> {
        let len = u16::try_from(name.len()).ok()?;
        let words_needed = (name.len() + 1).div_ceil(WORD_BYTES);
        if self.back < self.front() + words_needed {
            return None;
        }
        let start = self.back - words_needed;
        let slot: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words[start..self.back]);
        slot[..name.len()].copy_from_slice(name.as_bytes());
        slot[name.len()] = 0;
        self.back = start;
        Some(NameRef {
            offset: (start * WORD_BYTES) as u32,
            len,
        })
    }

    /// Attach a name to a reserved record.
    pub fn set_name(&mut self, index: usize, name: NameRef) {
        if let Some(record) = self.records_mut().get_mut(index) {
            record.name_offset = name.offset;
            record.name_len = name.len;
        }
    }

    /// Drop every record at or after `len`. Names already written stay where they are.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Append one complete entry; on a name collision the record reservation is rolled back.
    pub fn push(&mut self, kind: FileType, name: &str, size: u32, modified: u32) -> Option<usize> {
        let index = self.append_entry(kind, size, modified)?;
        match self.append_name(name) {
            Some(name_ref) => {
                self.set_name(index, name_ref);
                Some(index)
            }
            None => {
                self.truncate(index);
                None
            }
        }
    }

    /// Committed records in their current order.
    pub fn records(&self) -> &[EntryRecord] {
        bytemuck::cast_slice(&self.words[..self.front()])
    }

    fn records_mut(&mut self) -> &mut [EntryRecord] {
        let front = self.front();
        bytemuck::cast_slice_mut(&mut self.words[..front])
    }

    /// Entry at `index`, if committed.
    pub fn entry(&self, index: usize) -> Option<CatalogEntry<'_>> {
        let record = self.records().get(index)?;
        Some(view(record, bytemuck::cast_slice(&self.words), 0))
    }

    /// All committed entries in order.
    pub fn iter(&self) -> impl Iterator<Item = CatalogEntry<'_>> + '_ {
        let bytes: &[u8] = bytemuck::cast_slice(&self.words);
        self.records().iter().map(move |r| view(r, bytes, 0))
    }

    /// Generation-tagged handle for `index`.
    pub fn handle(&self, index: usize) -> Option<EntryHandle> {
        let record = self.records().get(index)?;
        Some(EntryHandle {
            generation: self.generation,
            index: index as u32,
            name_offset: record.name_offset,
        })
    }

    /// Current position of the entry behind `handle`; `None` once the arena has been reset
    /// since it was taken.
    pub fn position(&self, handle: EntryHandle) -> Option<usize> {
        if handle.generation != self.generation {
            return None;
        }
        let records = self.records();
        match records.get(handle.index()) {
            Some(record) if record.name_offset == handle.name_offset => Some(handle.index()),
            _ => records
                .iter()
                .position(|r| r.name_offset == handle.name_offset),
        }
    }

    /// Resolve a handle; `None` once the arena has been reset since it was taken.
    pub fn resolve(&self, handle: EntryHandle) -> Option<CatalogEntry<'_>> {
        self.entry(self.position(handle)?)
    }

    /// Reorder the committed records in place. Name bytes are not touched.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&CatalogEntry<'_>, &CatalogEntry<'_>) -> Ordering,
    {
        let front = self.front();
        let back = self.back;
        let (head, tail) = self.words.split_at_mut(back);
        let records: &mut [EntryRecord] = bytemuck::cast_slice_mut(&mut head[..front]);
        let names: &[u8] = bytemuck::cast_slice(tail);
        let base = back * WORD_BYTES;
        records.sort_unstable_by(|a, b| compare(&view(a, names, base), &view(b, names, base)));
    }
}

fn view<'a>(record: &EntryRecord, bytes: &'a [u8], base: usize) -> CatalogEntry<'a> {
    let start = (record.name_offset as usize).saturating_sub(base);
    let name = bytes
        .get(start..start + usize::from(record.name_len))
        .and_then(|b| std::str::from_utf8(b).ok())
        .unwrap_or("");
    CatalogEntry {
        kind: FileType::from_u8(record.kind),
        name,
        size: record.size,
        modified: record.modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(arena: &EntryArena) -> Vec<String> {
        arena.iter().map(|e| e.name.to_string()).collect()
    }

    #[test]
    fn record_is_sixteen_bytes() {
        assert_eq!(RECORD_BYTES, 16);
    }

    #[test]
    fn names_are_nul_terminated_and_word_aligned() {
        let mut arena = EntryArena::with_capacity(256);
        let a = arena.append_name("abc").unwrap();
        let b = arena.append_name("abcd").unwrap();
        assert_eq!(a.offset % 4, 0);
        assert_eq!(b.offset % 4, 0);
        // "abc\0" fits one word, "abcd\0" needs two.
        assert_eq!(a.offset - b.offset, 8);
        let bytes: &[u8] = bytemuck::cast_slice(&arena.words);
        assert_eq!(&bytes[a.offset as usize..a.offset as usize + 4], b"abc\0");
        assert_eq!(arena.used_bytes(), 12);
    }

    #[test]
    fn rejected_push_is_rolled_back_and_keeps_committed_names() {
        // 16 words: each entry takes 4 record words + 2 name words.
        let mut arena = EntryArena::with_capacity(64);
        assert_eq!(arena.push(FileType::Other, "a.txt", 1, 10), Some(0));
        assert_eq!(arena.push(FileType::Other, "b.txt", 2, 20), Some(1));
        // The record still fits, the name does not.
        assert_eq!(arena.push(FileType::Other, "c.txt", 3, 30), None);
        assert_eq!(arena.len(), 2);
        assert_eq!(names(&arena), vec!["a.txt", "b.txt"]);
        // Nothing fits afterwards either.
        assert_eq!(arena.push(FileType::Other, "", 0, 0), None);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.entry(1).unwrap().size, 2);
    }

    #[test]
    fn append_entry_fails_without_side_effect() {
        let mut arena = EntryArena::with_capacity(RECORD_BYTES);
        assert_eq!(arena.append_entry(FileType::Image, 5, 6), Some(0));
        assert_eq!(arena.append_entry(FileType::Image, 5, 6), None);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.append_name("x"), None);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut arena = EntryArena::with_capacity(0);
        assert_eq!(arena.push(FileType::Directory, "d", 0, 0), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut arena = EntryArena::with_capacity(128);
        arena.push(FileType::DataLog, "run.dlog", 7, 1).unwrap();
        let handle = arena.handle(0).unwrap();
        assert_eq!(arena.resolve(handle).unwrap().name, "run.dlog");
        assert!(arena.handle(1).is_none());

        arena.reset();
        assert!(arena.is_empty());
        assert!(arena.resolve(handle).is_none());

        arena.push(FileType::Other, "new.txt", 1, 1).unwrap();
        assert!(arena.resolve(handle).is_none());
        assert_eq!(arena.resolve(arena.handle(0).unwrap()).unwrap().name, "new.txt");
    }

    #[test]
    fn sort_moves_records_not_names() {
        let mut arena = EntryArena::with_capacity(256);
        arena.push(FileType::Other, "b", 2, 0).unwrap();
        arena.push(FileType::Other, "a", 1, 0).unwrap();
        arena.push(FileType::Other, "c", 3, 0).unwrap();
        let used = arena.used_bytes();
        arena.sort_by(|x, y| x.name.cmp(y.name));
        assert_eq!(names(&arena), vec!["a", "b", "c"]);
        assert_eq!(
            arena.iter().map(|e| e.size).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(arena.used_bytes(), used);
    }

    #[test]
    fn handles_follow_their_entry_through_a_sort() {
        let mut arena = EntryArena::with_capacity(256);
        arena.push(FileType::Other, "b", 2, 0).unwrap();
        arena.push(FileType::Other, "a", 1, 0).unwrap();
        let b = arena.handle(0).unwrap();
        assert_eq!(b.index(), 0);

        arena.sort_by(|x, y| x.name.cmp(y.name));
        assert_eq!(arena.position(b), Some(1));
        assert_eq!(arena.resolve(b).unwrap().name, "b");

        arena.reset();
        assert_eq!(arena.position(b), None);
    }
}
