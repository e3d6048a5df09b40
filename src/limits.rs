use crate::model::Ms;

/// Hard input caps. Requests over these bounds are rejected at validation,
/// before anything reaches the journal.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 250;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_COMMENT_LEN: usize = 512;
pub const MAX_SEARCH_TEXT_LEN: usize = 255;

/// Timestamps must be non-negative and before 2100-01-01T00:00:00Z.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

/// A single booking window may not exceed one year.
pub const MAX_SPAN_DURATION_MS: Ms = 366 * 24 * 3_600_000;

/// Depth of the group-commit channel between the engine and the WAL writer.
pub const WAL_CHANNEL_DEPTH: usize = 4096;
