mod feed_source;
mod post;

pub use feed_source::*;
pub use post::*;
