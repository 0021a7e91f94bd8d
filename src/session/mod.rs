//! Session recording and persistence module
//!
//! This module aggregates the extrema of a running session and turns the
//! final state into exactly one [`SessionRecord`] when it ends.
//!
//! # Features
//!
//! - Track range-of-motion extrema while a session is active
//! - Finalize once per session, whichever stop path gets there first
//! - Hold a record the store rejected so it can be retried
//! - Append records to JSON-lines files or an in-memory store

pub mod recorder;
pub mod store;
pub mod types;

pub use recorder::SessionRecorder;
pub use store::{JsonLinesStore, MemoryStore, SessionStore};
pub use types::{FinalizeOutcome, RangeOfMotion, RecorderState, SessionRecord, StopReason};
