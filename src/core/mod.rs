//! Core types shared by every subsystem.
//!
//! Time is video-relative milliseconds (i64). Comment records are created
//! from raw source lines and owned by the comment queue until consumed.

pub mod comment;
pub mod time;

pub use comment::{parse_line, CommentRecord, MalformedLine};
pub use time::{Millis, ZERO};
