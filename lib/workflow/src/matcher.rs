//! Trigger matcher.
//!
//! Given an inbound message event, selects the active workflows whose
//! trigger fires for it. Matching is scoped to the event's tenant.

use crate::context::InboundMessage;
use crate::definition::Workflow;
use crate::store::EngineStore;
use std::sync::Arc;
use tracing::warn;

/// Selects workflows to run for an inbound message event.
#[derive(Clone)]
pub struct TriggerMatcher {
    store: Arc<dyn EngineStore>,
}

impl TriggerMatcher {
    /// Creates a matcher over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Returns the active workflows whose trigger fires for `event`.
    ///
    /// A store failure is logged and yields no matches; the webhook path
    /// must never bubble a database error back to the channel provider.
    pub async fn find_triggered(&self, event: &InboundMessage) -> Vec<Workflow> {
        let workflows = match self.store.active_workflows(event.tenant_id).await {
            Ok(workflows) => workflows,
            Err(error) => {
                warn!(
                    tenant_id = %event.tenant_id,
                    %error,
                    "failed to load active workflows, skipping trigger matching"
                );
                return Vec::new();
            }
        };

        workflows
            .into_iter()
            .filter(|workflow| workflow.trigger.matches(&event.content))
            .collect()
    }
}
