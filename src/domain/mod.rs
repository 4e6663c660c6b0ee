pub mod comment;
pub mod node;
pub mod story;
pub mod summary;
pub mod time;

pub use comment::Comment;
pub use node::CommentNode;
pub use story::Story;
pub use summary::CatchUpSummary;
