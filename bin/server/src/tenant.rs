//! Tenant resolution for inbound webhooks.
//!
//! Every webhook event names the channel-side account it was delivered
//! to (WhatsApp phone number id, Instagram account id). That account
//! maps to exactly one tenant; an unmapped account is a hard, typed
//! failure rather than a fallback to some default tenant.

use inboxflow_conversation::Channel;
use inboxflow_core::TenantId;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Errors from tenant resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolveError {
    /// No tenant owns the receiving channel account.
    TenantNotFound { channel: Channel, account_id: String },
    /// The lookup query failed.
    QueryFailed { reason: String },
    /// The stored tenant id does not parse.
    CorruptRecord { reason: String },
}

impl fmt::Display for TenantResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantNotFound {
                channel,
                account_id,
            } => {
                write!(f, "no tenant for {channel} account {account_id}")
            }
            Self::QueryFailed { reason } => write!(f, "tenant lookup failed: {reason}"),
            Self::CorruptRecord { reason } => write!(f, "corrupt tenant mapping: {reason}"),
        }
    }
}

impl std::error::Error for TenantResolveError {}

/// Resolves channel accounts to tenants.
#[derive(Clone)]
pub struct TenantResolver {
    pool: PgPool,
}

impl TenantResolver {
    /// Creates a resolver over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the tenant owning `account_id` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`TenantResolveError::TenantNotFound`] when no mapping
    /// exists; the caller decides whether to drop or dead-letter the
    /// event.
    pub async fn resolve(
        &self,
        channel: Channel,
        account_id: &str,
    ) -> Result<TenantId, TenantResolveError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT tenant_id FROM tenant_channels WHERE channel = $1 AND account_id = $2",
        )
        .bind(channel.as_str())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TenantResolveError::QueryFailed {
            reason: e.to_string(),
        })?;

        let (tenant_id,) = row.ok_or_else(|| TenantResolveError::TenantNotFound {
            channel,
            account_id: account_id.to_string(),
        })?;

        TenantId::from_str(&tenant_id).map_err(|e| TenantResolveError::CorruptRecord {
            reason: format!("tenant id '{tenant_id}': {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_channel_and_account() {
        let err = TenantResolveError::TenantNotFound {
            channel: Channel::Whatsapp,
            account_id: "1029384".to_string(),
        };
        assert_eq!(err.to_string(), "no tenant for whatsapp account 1029384");
    }
}
