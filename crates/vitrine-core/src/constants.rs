//! Upload contract constants
//!
//! Single source of truth for the limits the ingestion endpoints advertise.
//! Config can tighten or relax the env-tunable ones; these are the defaults
//! the public contract documents.

/// Maximum size of a single uploaded file (10 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum combined size of all accepted files in one request (100 MiB).
pub const MAX_BATCH_SIZE_BYTES: usize = 100 * 1024 * 1024;

/// Maximum number of files accepted in a single upload request.
pub const MAX_FILES_PER_REQUEST: usize = 8;

/// Content types accepted by the per-file validator.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// File extensions accepted by the per-file validator (compared lowercase).
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Accepted upload requests per client per window.
pub const UPLOAD_RATE_LIMIT_PER_MINUTE: u32 = 20;

/// Fixed rate-limit window length in seconds.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Pixel dimension above which the validator emits an advisory suggestion.
pub const SUGGESTION_DIMENSION_THRESHOLD: u32 = 4000;
