use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Channel, User};

/// Loads a live channel; deleted channels read as missing.
pub fn load_channel(store: &dyn Store, channel_id: &str) -> Result<Channel, ApiError> {
    store
        .get_channel(channel_id)
        .api_err("Failed to load channel")?
        .filter(|c| !c.deleted)
        .or_not_found(format!("Channel with id {channel_id} not found"))
}

pub fn is_editor(store: &dyn Store, user: &User, channel: &Channel) -> Result<bool, ApiError> {
    if user.is_admin {
        return Ok(true);
    }
    store
        .is_channel_editor(&channel.id, &user.id)
        .api_err("Failed to check channel editors")
}

/// Public channels, editors, viewers and admins may look at a channel.
pub fn can_access_channel(store: &dyn Store, user: &User, channel: &Channel) -> Result<(), ApiError> {
    if channel.public || is_editor(store, user, channel)? {
        return Ok(());
    }
    let viewer = store
        .is_channel_viewer(&channel.id, &user.id)
        .api_err("Failed to check channel viewers")?;
    if viewer {
        Ok(())
    } else {
        Err(ApiError::forbidden("No permission to access this channel"))
    }
}

pub fn can_edit_channel(store: &dyn Store, user: &User, channel: &Channel) -> Result<(), ApiError> {
    if is_editor(store, user, channel)? {
        Ok(())
    } else {
        Err(ApiError::forbidden("No permission to edit this channel"))
    }
}
