//! high-level operations on update repositories

mod channel;
mod publish;

pub use channel::{create_channel, set_channel};
pub use publish::{publish, publish_with_hasher, PublishOptions, PublishReport};
