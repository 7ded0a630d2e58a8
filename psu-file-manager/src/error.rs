use thiserror::Error;

/// SCPI "Mass storage error".
pub const SCPI_ERROR_MASS_STORAGE_ERROR: i16 = -250;
/// SCPI "Missing mass media".
pub const SCPI_ERROR_MISSING_MASS_MEDIA: i16 = -252;
/// SCPI "File name not found".
pub const SCPI_ERROR_FILE_NAME_NOT_FOUND: i16 = -256;
/// SCPI "File name error".
pub const SCPI_ERROR_FILE_NAME_ERROR: i16 = -257;

/// Result alias used across the crate.
pub type Result<T, E = FileManagerError> = std::result::Result<T, E>;

/// Errors produced by the file manager core.
///
/// None of these are fatal: they end up either as a state transition
/// (`NotPresent`) or as a message shown through [`UiHost::show_error`](crate::UiHost::show_error).
#[derive(Error, Debug)]
pub enum FileManagerError {
    /// No storage medium is mounted.
    #[error("storage medium not present")]
    NotPresent,
    /// The storage driver failed while performing `op`.
    #[error("mass storage error during {op}: {source}")]
    Storage {
        /// Short operation label ("catalog", "rename", ...).
        op: &'static str,
        /// Driver error.
        #[source]
        source: std::io::Error,
    },
    /// `directory + "/" + name` does not fit the maximum path length.
    #[error("file name error: path of {len} bytes exceeds the {max} byte limit")]
    PathTooLong {
        /// Length of the rejected path.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
    /// The image viewer could not decode the selected file.
    #[error("failed to load image: {0}")]
    ImageDecode(String),
}

impl FileManagerError {
    pub(crate) fn storage(op: &'static str, source: std::io::Error) -> Self {
        Self::Storage { op, source }
    }

    /// SCPI error number reported for this error on the remote interface.
    pub fn scpi_code(&self) -> i16 {
        match self {
            Self::NotPresent => SCPI_ERROR_MISSING_MASS_MEDIA,
            Self::Storage { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => SCPI_ERROR_FILE_NAME_NOT_FOUND,
                std::io::ErrorKind::NotConnected => SCPI_ERROR_MISSING_MASS_MEDIA,
                _ => SCPI_ERROR_MASS_STORAGE_ERROR,
            },
            Self::PathTooLong { .. } => SCPI_ERROR_FILE_NAME_ERROR,
            Self::ImageDecode(_) => SCPI_ERROR_MASS_STORAGE_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_scpi_codes() {
        let missing = FileManagerError::storage(
            "rename",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(missing.scpi_code(), SCPI_ERROR_FILE_NAME_NOT_FOUND);

        let failed = FileManagerError::storage("delete", std::io::Error::other("bad sector"));
        assert_eq!(failed.scpi_code(), SCPI_ERROR_MASS_STORAGE_ERROR);
        assert!(failed.to_string().contains("delete"));

        let long = FileManagerError::PathTooLong { len: 300, max: 255 };
        assert_eq!(long.scpi_code(), SCPI_ERROR_FILE_NAME_ERROR);
    }
}
