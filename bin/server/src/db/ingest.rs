//! Inbound message ingestion.
//!
//! Turns a decoded webhook payload into an [`InboundMessage`] the engine
//! can run on: upserts the contact by channel address, finds or creates
//! the conversation, and records the inbound message. Failures surface
//! as [`StoreError`] values wrapped in a `rootcause` report.

use chrono::{DateTime, Utc};
use inboxflow_conversation::{Channel, ContactSnapshot};
use inboxflow_core::{ContactId, ConversationId, MessageId, Result, TenantId};
use inboxflow_workflow::{InboundMessage, StoreError};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// A webhook payload decoded down to the fields ingestion needs.
#[derive(Debug, Clone)]
pub struct InboundText {
    /// The contact's channel address (phone number or Instagram-scoped
    /// user id).
    pub sender_address: String,
    /// Display name reported by the provider.
    pub profile_name: String,
    /// The message text.
    pub text: String,
}

#[derive(FromRow)]
struct ContactRow {
    id: String,
    name: String,
    phone: Option<String>,
    instagram_id: Option<String>,
    tags: Vec<String>,
}

fn query_failed(e: impl std::fmt::Display) -> StoreError {
    StoreError::QueryFailed {
        reason: e.to_string(),
    }
}

fn write_failed(e: impl std::fmt::Display) -> StoreError {
    StoreError::WriteFailed {
        reason: e.to_string(),
    }
}

/// Ingests one inbound text and returns the event to hand to the engine.
///
/// # Errors
///
/// Returns an error if any of the upserts or inserts fail.
pub async fn ingest_inbound(
    pool: &PgPool,
    tenant_id: TenantId,
    channel: Channel,
    inbound: &InboundText,
) -> Result<InboundMessage, StoreError> {
    let contact = upsert_contact(pool, tenant_id, channel, inbound).await?;
    let contact_id = ContactId::from_str(&contact.id)
        .map_err(|e| query_failed(format!("invalid contact id '{}': {e}", contact.id)))?;

    let conversation_id = find_or_create_conversation(pool, tenant_id, contact_id, channel).await?;

    let message_id = MessageId::new();
    let received_at: DateTime<Utc> = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO messages
            (id, tenant_id, conversation_id, sender, content, timestamp)
        VALUES ($1, $2, $3, 'contact', $4, $5)
        "#,
    )
    .bind(message_id.to_string())
    .bind(tenant_id.to_string())
    .bind(conversation_id.to_string())
    .bind(&inbound.text)
    .bind(received_at)
    .execute(pool)
    .await
    .map_err(write_failed)?;

    Ok(InboundMessage {
        tenant_id,
        conversation_id,
        message_id,
        contact_id,
        channel,
        content: inbound.text.clone(),
        contact: ContactSnapshot {
            name: contact.name,
            phone: contact.phone,
            instagram_id: contact.instagram_id,
            tags: contact.tags,
        },
        received_at,
    })
}

async fn upsert_contact(
    pool: &PgPool,
    tenant_id: TenantId,
    channel: Channel,
    inbound: &InboundText,
) -> Result<ContactRow, StoreError> {
    let query = match channel {
        Channel::Whatsapp => {
            r#"
            INSERT INTO contacts (id, tenant_id, name, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, phone) WHERE phone IS NOT NULL
            DO UPDATE SET name = EXCLUDED.name, updated_at = now()
            RETURNING id, name, phone, instagram_id, tags
            "#
        }
        Channel::Instagram => {
            r#"
            INSERT INTO contacts (id, tenant_id, name, instagram_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, instagram_id) WHERE instagram_id IS NOT NULL
            DO UPDATE SET name = EXCLUDED.name, updated_at = now()
            RETURNING id, name, phone, instagram_id, tags
            "#
        }
    };

    let row = sqlx::query_as(query)
        .bind(ContactId::new().to_string())
        .bind(tenant_id.to_string())
        .bind(&inbound.profile_name)
        .bind(&inbound.sender_address)
        .fetch_one(pool)
        .await
        .map_err(write_failed)?;
    Ok(row)
}

async fn find_or_create_conversation(
    pool: &PgPool,
    tenant_id: TenantId,
    contact_id: ContactId,
    channel: Channel,
) -> Result<ConversationId, StoreError> {
    let existing: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT id FROM conversations
        WHERE tenant_id = $1 AND contact_id = $2 AND channel = $3
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id.to_string())
    .bind(contact_id.to_string())
    .bind(channel.as_str())
    .fetch_optional(pool)
    .await
    .map_err(query_failed)?;

    if let Some((id,)) = existing {
        let id = ConversationId::from_str(&id)
            .map_err(|e| query_failed(format!("invalid conversation id '{id}': {e}")))?;
        return Ok(id);
    }

    let conversation_id = ConversationId::new();
    sqlx::query(
        r#"
        INSERT INTO conversations (id, tenant_id, contact_id, channel)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(conversation_id.to_string())
    .bind(tenant_id.to_string())
    .bind(contact_id.to_string())
    .bind(channel.as_str())
    .execute(pool)
    .await
    .map_err(write_failed)?;

    Ok(conversation_id)
}
