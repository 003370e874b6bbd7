pub use crate::error::{ClResult, Error};
pub use crate::types::{CommentId, PageId, Timestamp};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
