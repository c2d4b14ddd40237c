use crate::error::Result;
use crate::repo::{update_index, Repo};
use crate::types::ChannelChange;

/// create a channel with no pinned version
pub fn create_channel(repo: &Repo, channel_id: &str) -> Result<()> {
    update_index(repo, |index| index.create_channel(channel_id))?;
    tracing::info!(channel = channel_id, "created channel");
    Ok(())
}

/// point a channel at a version, creating it if needed
///
/// `None` or a negative version removes an existing channel; a missing one is
/// created without a pinned version.
pub fn set_channel(repo: &Repo, channel_id: &str, version: Option<i64>) -> Result<ChannelChange> {
    let change = update_index(repo, |index| Ok(index.set_channel(channel_id, version)))?;

    match change {
        ChannelChange::Removed => tracing::info!(channel = channel_id, "removed channel"),
        _ => tracing::info!(channel = channel_id, version = ?version, ?change, "set channel"),
    }
    Ok(change)
}
