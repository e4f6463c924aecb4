mod feed_source;
mod gateway;
mod post;

pub use feed_source::FeedSourceRepository;
pub use gateway::{FeedRepository, PgFeedRepository};
pub use post::PostRepository;
