/// Maximum upload size in bytes (5 MiB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Channel name prefix that marks a direct-message channel
pub const DM_PREFIX: &str = "dm_";

/// Separator between DM participants and between avatar name and user id
pub const NAME_SEPARATOR: char = '_';

/// Fallback name for uploads that arrive without a filename
pub const DEFAULT_UPLOAD_NAME: &str = "uploaded-file";

/// Fallback MIME type for uploads that arrive without one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Public URL prefix under which stored files are served
pub const FILES_ROUTE: &str = "/files";

/// Build the retrieval URL for a stored file.
pub fn file_url(id: uuid::Uuid) -> String {
    format!("{FILES_ROUTE}/{id}")
}
