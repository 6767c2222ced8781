//! Run-wide constants and validation for split settings.

use crate::error::Error;

/// Heading level split at when the caller does not choose one.
pub const DEFAULT_HEADING_LEVEL: u32 = 3;

/// Deepest heading level Word ships a built-in style for.
pub const MAX_HEADING_LEVEL: u32 = 9;

/// Output names are cut to this many characters before the extension.
pub const DEFAULT_MAX_TITLE_LEN: usize = 240;

/// The cleaner polls for cancellation every this many paragraphs.
pub const CLEAN_CHECK_INTERVAL: usize = 100;

/// The partitioner polls for cancellation every this many paragraphs.
pub const PARTITION_CHECK_INTERVAL: usize = 50;

/// Bound of the worker -> caller event channel. A slow consumer stalls the
/// worker rather than growing the queue.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Appended to the input's file stem to name the archive.
pub const ARCHIVE_SUFFIX: &str = "_sections";

pub const ARCHIVE_EXTENSION: &str = "zip";

pub const DOCUMENT_EXTENSION: &str = "docx";

/// Used when a heading sanitizes down to nothing (e.g. "???").
pub const FALLBACK_SECTION_NAME: &str = "section";

/// The splitter itself works for any positive level; only zero is rejected.
pub fn validate_heading_level(level: u32) -> Result<(), Error> {
    if level == 0 {
        return Err(Error::Config(
            "heading level must be a positive integer".into(),
        ));
    }
    Ok(())
}

pub fn validate_max_title_len(len: usize) -> Result<(), Error> {
    if len == 0 {
        return Err(Error::Config(
            "maximum title length must be at least 1".into(),
        ));
    }
    Ok(())
}
