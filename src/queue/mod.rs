pub mod overflow;
pub mod repeat;
pub mod ring;

pub use overflow::{DropReason, DroppedComment, OverflowList};
pub use repeat::RepeatFilter;
pub use ring::{CommentQueue, Slot};
