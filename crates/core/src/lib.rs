// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-core: Shared data model for the tillsync mutation queue.
//!
//! This crate provides the request vocabulary, the replayable request
//! snapshot codec, the queued mutation record, and the small file and clock
//! primitives used by the `tillsync` runtime.

pub mod clock;
pub mod error;
pub mod id;
pub mod identity;
pub mod jsonl;
pub mod method;
pub mod mutation;
pub mod request;
pub mod snapshot;

pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use method::Method;
pub use mutation::{Backoff, Bookkeeping, QueuedMutation, DEFAULT_MAX_RETRIES};
pub use request::{Body, Request, TransportOptions};
pub use snapshot::{decode, encode, Encoded, RequestSnapshot, SnapshotBody};
