pub const CREDENTIAL_ERROR: &str = "CREDENTIAL_ERROR";
pub const LIST_ERROR: &str = "LIST_ERROR";
pub const DOWNLOAD_ERROR: &str = "DOWNLOAD_ERROR";
pub const ARCHIVE_ERROR: &str = "ARCHIVE_ERROR";
pub const UPLOAD_ERROR: &str = "UPLOAD_ERROR";

// non-fatal, logged as warn and never change the exit status
pub const TAG_ERROR: &str = "TAG_ERROR";
pub const CLEANUP_ERROR: &str = "CLEANUP_ERROR";
