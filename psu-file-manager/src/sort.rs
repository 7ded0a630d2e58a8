use std::cmp::Ordering;

use crate::arena::{CatalogEntry, EntryArena};
use crate::core::{SortKey, SortOrder};

fn cmp_name_no_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Compare two entries by a single sort order.
pub fn compare(a: &CatalogEntry<'_>, b: &CatalogEntry<'_>, order: SortOrder) -> Ordering {
    let ord = match order.key() {
        SortKey::Name => cmp_name_no_case(a.name, b.name),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Time => a.modified.cmp(&b.modified),
    };
    if order.is_ascending() {
        ord
    } else {
        ord.reverse()
    }
}

/// `primary`, then two fixed fallback keys so distinct entries never tie.
pub fn full_compare(a: &CatalogEntry<'_>, b: &CatalogEntry<'_>, primary: SortOrder) -> Ordering {
    let [second, third] = match primary.key() {
        SortKey::Name => [SortOrder::SizeAsc, SortOrder::TimeAsc],
        SortKey::Size => [SortOrder::NameAsc, SortOrder::TimeAsc],
        SortKey::Time => [SortOrder::NameAsc, SortOrder::SizeAsc],
    };
    compare(a, b, primary)
        .then_with(|| compare(a, b, second))
        .then_with(|| compare(a, b, third))
}

/// Sort the committed catalog records in place.
pub fn sort_catalog(arena: &mut EntryArena, primary: SortOrder) {
    arena.sort_by(|a, b| full_compare(a, b, primary));
}
