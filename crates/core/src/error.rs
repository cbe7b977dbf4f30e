//! Unified error types for vernetzen.
//!
//! Messages carry a stable code prefix so log lines can be grepped by failure
//! class.

use tokio_rusqlite::rusqlite;

/// Unified error types for the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem operation on the cache root failed.
    #[error("CACHE_IO: {0}")]
    CacheIo(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Error::CacheIo(format!("{}: {}", path.display(), err))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MigrationFailed("no such table: cache_entries".to_string());
        assert!(err.to_string().starts_with("CACHE_ERROR"));
        assert!(err.to_string().contains("cache_entries"));
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io(
            std::path::Path::new("/tmp/vernetzen/abc"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("CACHE_IO"));
        assert!(msg.contains("/tmp/vernetzen/abc"));
        assert!(msg.contains("denied"));
    }
}
