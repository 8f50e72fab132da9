//! Core domain types and utilities for the inboxflow platform.
//!
//! This crate provides the foundational typed identifiers and error
//! handling shared by the messaging automation engine and its adapters.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{
    AgentId, ContactId, ConversationId, ExecutionId, MessageId, NodeId, TenantId, WorkflowId,
};
