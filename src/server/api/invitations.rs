use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::load_channel;
use crate::server::dto::{AcceptInviteRequest, ChannelResponse};
use crate::server::response::{ApiError, Payload, StoreOptionExt, StoreResultExt};
use crate::types::{Invitation, ShareMode, User};

fn is_invitee(invitation: &Invitation, user: &User) -> bool {
    match &invitation.invited_id {
        Some(invited_id) => invited_id == &user.id,
        None => invitation.email.eq_ignore_ascii_case(&user.email),
    }
}

/// Applies an invitation to the caller and returns the channel they joined.
pub async fn accept_channel_invite(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<AcceptInviteRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let invitation = store
        .get_invitation(&body.invitation_id)
        .api_err("Failed to load invitation")?
        .or_not_found(format!("Invitation with id {} not found", body.invitation_id))?;

    if !is_invitee(&invitation, &user) {
        return Err(ApiError::forbidden("This invitation was sent to someone else"));
    }

    let channel = load_channel(store, &invitation.channel_id)?;

    store
        .accept_invitation(&invitation, &user.id)
        .api_err("Failed to accept invitation")?;

    tracing::info!(
        channel_id = %channel.id,
        user_id = %user.id,
        share_mode = invitation.share_mode.as_str(),
        "Accepted channel invitation"
    );

    let is_view_only = invitation.share_mode == ShareMode::View;
    Ok::<_, ApiError>(Json(ChannelResponse::new(channel, is_view_only)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: None,
            is_admin: false,
            policies_accepted: true,
            content_defaults: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invitation(invited_id: Option<&str>, email: &str) -> Invitation {
        Invitation {
            id: "inv".to_string(),
            channel_id: "ch".to_string(),
            email: email.to_string(),
            invited_id: invited_id.map(str::to_string),
            sender_id: None,
            share_mode: ShareMode::View,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_invitee_matches_by_id_then_email() {
        let alice = user("alice", "alice@example.com");

        assert!(is_invitee(&invitation(Some("alice"), "other@example.com"), &alice));
        assert!(!is_invitee(&invitation(Some("bob"), "alice@example.com"), &alice));
        assert!(is_invitee(&invitation(None, "Alice@Example.com"), &alice));
        assert!(!is_invitee(&invitation(None, "bob@example.com"), &alice));
    }
}
