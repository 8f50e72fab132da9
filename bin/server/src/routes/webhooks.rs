//! Channel webhook entry points.
//!
//! Both routes follow the same contract: decode the payload, resolve
//! the tenant, ingest the message, hand the event to the engine on a
//! detached task, and acknowledge immediately. The provider is always
//! answered 200 once the payload parses; retrying a dropped event
//! against a broken mapping or store would not help.

use crate::db::ingest::{self, InboundText};
use crate::state::AppState;
use crate::tenant::TenantResolveError;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use inboxflow_conversation::Channel;
use serde::Deserialize;
use tracing::{error, info, warn};

/// A WhatsApp Cloud API message event, pre-flattened by the provider
/// integration.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppEvent {
    /// The business phone number id the message was delivered to.
    pub phone_number_id: String,
    /// The sender's phone number.
    pub from: String,
    /// The sender's display name.
    #[serde(default)]
    pub profile_name: String,
    /// The message text.
    pub text: String,
}

/// An Instagram Messaging webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramEvent {
    /// The Instagram business account id the message was delivered to.
    pub account_id: String,
    /// The sender's Instagram-scoped user id.
    pub sender_id: String,
    /// The sender's display name.
    #[serde(default)]
    pub profile_name: String,
    /// The message text.
    pub text: String,
}

/// `POST /webhooks/whatsapp`
pub async fn whatsapp(State(state): State<AppState>, Json(event): Json<WhatsAppEvent>) -> StatusCode {
    let inbound = InboundText {
        sender_address: event.from.clone(),
        profile_name: display_name(&event.profile_name, &event.from),
        text: event.text,
    };
    accept(state, Channel::Whatsapp, &event.phone_number_id, inbound).await
}

/// `POST /webhooks/instagram`
pub async fn instagram(
    State(state): State<AppState>,
    Json(event): Json<InstagramEvent>,
) -> StatusCode {
    let inbound = InboundText {
        sender_address: event.sender_id.clone(),
        profile_name: display_name(&event.profile_name, &event.sender_id),
        text: event.text,
    };
    accept(state, Channel::Instagram, &event.account_id, inbound).await
}

fn display_name(profile_name: &str, fallback: &str) -> String {
    if profile_name.is_empty() {
        fallback.to_string()
    } else {
        profile_name.to_string()
    }
}

async fn accept(
    state: AppState,
    channel: Channel,
    account_id: &str,
    inbound: InboundText,
) -> StatusCode {
    let tenant_id = match state.resolver.resolve(channel, account_id).await {
        Ok(tenant_id) => tenant_id,
        Err(error @ TenantResolveError::TenantNotFound { .. }) => {
            warn!(%error, "dropping webhook event for unmapped account");
            return StatusCode::OK;
        }
        Err(error) => {
            error!(%error, "tenant resolution failed, dropping webhook event");
            return StatusCode::OK;
        }
    };

    let event = match ingest::ingest_inbound(&state.pool, tenant_id, channel, &inbound).await {
        Ok(event) => event,
        Err(error) => {
            error!(%error, %tenant_id, "failed to ingest inbound message");
            return StatusCode::OK;
        }
    };

    info!(
        %tenant_id,
        message_id = %event.message_id,
        %channel,
        "accepted inbound message"
    );

    // Run the engine off the request path; the provider gets its ack now.
    let engine = state.engine.clone();
    tokio::spawn(async move {
        engine.on_message(&event).await;
    });

    StatusCode::OK
}
