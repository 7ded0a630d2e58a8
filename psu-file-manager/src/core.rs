/// Classified type of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FileType {
    /// A directory.
    Directory = 0,
    /// A data-log recording (`.dlog`).
    DataLog = 1,
    /// An image the viewer can show (`.jpg`, `.jpeg`, `.png`).
    Image = 2,
    /// A script the interpreter can run (`.py`).
    Script = 3,
    /// Anything else.
    Other = 4,
}

impl FileType {
    /// Classify a regular file by its extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Self::Other;
        };
        if ext.eq_ignore_ascii_case("dlog") {
            Self::DataLog
        } else if ext.eq_ignore_ascii_case("jpg")
            || ext.eq_ignore_ascii_case("jpeg")
            || ext.eq_ignore_ascii_case("png")
        {
            Self::Image
        } else if ext.eq_ignore_ascii_case("py") {
            Self::Script
        } else {
            Self::Other
        }
    }

    /// Extension (with dot) appended to new files of this type in save dialogs.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::DataLog => ".dlog",
            Self::Image => ".jpg",
            Self::Script => ".py",
            Self::Directory | Self::Other => "",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Directory,
            1 => Self::DataLog,
            2 => Self::Image,
            3 => Self::Script,
            _ => Self::Other,
        }
    }
}

/// Key part of a [`SortOrder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Case-insensitive file name.
    Name,
    /// File size.
    Size,
    /// Modification time.
    Time,
}

/// Persisted file list ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Name, A to Z.
    #[default]
    NameAsc,
    /// Name, Z to A.
    NameDesc,
    /// Smallest first.
    SizeAsc,
    /// Largest first.
    SizeDesc,
    /// Oldest first.
    TimeAsc,
    /// Newest first.
    TimeDesc,
}

impl SortOrder {
    /// All six orders in their persisted numbering.
    pub const ALL: [SortOrder; 6] = [
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::SizeAsc,
        SortOrder::SizeDesc,
        SortOrder::TimeAsc,
        SortOrder::TimeDesc,
    ];

    /// The key this order sorts by.
    pub fn key(self) -> SortKey {
        match self {
            Self::NameAsc | Self::NameDesc => SortKey::Name,
            Self::SizeAsc | Self::SizeDesc => SortKey::Size,
            Self::TimeAsc | Self::TimeDesc => SortKey::Time,
        }
    }

    /// Whether the order is ascending.
    pub fn is_ascending(self) -> bool {
        matches!(self, Self::NameAsc | Self::SizeAsc | Self::TimeAsc)
    }

    /// Persisted index (0..6).
    pub fn index(self) -> u8 {
        Self::ALL.iter().position(|o| *o == self).unwrap_or(0) as u8
    }

    /// Decode a persisted index; out-of-range values fall back to [`SortOrder::NameAsc`].
    pub fn from_index(index: u8) -> Self {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .unwrap_or_default()
    }
}

/// File picker flavour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DialogType {
    /// Pick an existing file.
    #[default]
    Open,
    /// Pick an existing file or type a new name.
    Save,
}

/// User-visible catalog state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    /// No storage medium.
    #[default]
    NotPresent,
    /// Medium just became available; the first load is about to start.
    Starting,
    /// A catalog build is in progress.
    Loading,
    /// The catalog is available.
    Ready,
}

/// Splits `name` at its last dot: `("report", ".dlog")`, or `(name, "")` without one.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}

pub(crate) fn ends_with_no_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text.as_bytes()[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// Parent of a volume path; the root is the empty string.
pub(crate) fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_case_insensitively() {
        assert_eq!(FileType::from_file_name("run1.DLOG"), FileType::DataLog);
        assert_eq!(FileType::from_file_name("shot.jpeg"), FileType::Image);
        assert_eq!(FileType::from_file_name("ramp.Py"), FileType::Script);
        assert_eq!(FileType::from_file_name("notes.txt"), FileType::Other);
        assert_eq!(FileType::from_file_name("README"), FileType::Other);
    }

    #[test]
    fn sort_order_index_roundtrips_and_clamps() {
        for order in SortOrder::ALL {
            assert_eq!(SortOrder::from_index(order.index()), order);
        }
        assert_eq!(SortOrder::from_index(42), SortOrder::NameAsc);
    }

    #[test]
    fn path_helpers() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
        assert!(ends_with_no_case("LOG1.DLOG", ".dlog"));
        assert!(!ends_with_no_case("g", ".dlog"));
        assert_eq!(parent_dir("/logs/run.dlog"), "/logs");
        assert_eq!(parent_dir("/run.dlog"), "");
        assert_eq!(parent_dir("run.dlog"), "");
    }
}
