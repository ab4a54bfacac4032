//! Budget use-case services.
//!
//! # Responsibility
//! - Orchestrate local persistence and the remote mirror behind one state object.
//! - Keep front ends decoupled from storage and provider details.

pub mod budget_store;
pub mod sync_queue;
