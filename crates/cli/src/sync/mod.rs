// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation delivery: dispatch, durable queueing and reconciliation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  online  ┌─────────────┐     ┌─────────────┐
//! │   Gateway   │─────────►│  Transport  │────►│   Server    │
//! │ (Dispatch)  │          │   (trait)   │◄────│             │
//! └─────────────┘          └─────────────┘     └─────────────┘
//!        │ offline / retriable     ▲
//!        ▼                         │
//! ┌─────────────┐          ┌─────────────┐
//! │ QueueStore  │◄────────►│QueueManager │──► QueueEvent ──► Optimistic
//! │  (journal)  │          │  (passes)   │──► Invalidation
//! └─────────────┘          └─────────────┘
//! ```
//!
//! # Features
//!
//! - Durable queue with per-record exponential backoff
//! - Single-flight, debounced processing passes
//! - Pause and resume on connectivity changes
//! - Optimistic values reconciled with terminal outcomes
//! - Periodic resync of canonical state
//! - Injectable transport, clock and connectivity for testing

mod connectivity;
mod events;
mod gateway;
mod optimistic;
mod queue;
mod resync;
mod transport;

pub use connectivity::{ConnectivityOracle, SharedConnectivity};
pub use events::{EventBus, Invalidation, QueueEvent, Subscription};
pub use gateway::{Dispatched, Gateway, GatewayConfig, DEFAULT_TIMEOUT, QUEUED_STATUS};
pub use optimistic::{Handle, OptimisticCoordinator, View, ViewStatus};
pub use queue::{
    PassReport, QueueConfig, QueueDeps, QueueManager, QueueState, REASON_MAX_RETRIES,
};
pub use resync::{Refetch, ResyncLoop};
pub use transport::{
    classify_status, HttpTransport, Response, StatusClass, Transport, TransportError,
    TransportResult,
};

#[cfg(test)]
pub(crate) mod test_helpers;
