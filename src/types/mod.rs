mod index;
mod version;

pub use index::{Channel, ChannelChange, Index, VersionSummary};
pub use version::{FileInfo, FileSource, SourceType, Version};
