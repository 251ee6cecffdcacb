//! Realtime synchronization core for a two-party support chat client.
//!
//! Provides:
//! - `ChatClient` - Handle to the event loop that keeps the conversation
//!   list and the selected conversation's messages in sync
//! - `ChatSnapshot` - Published state for a display layer
//! - `Intent` and `Notice` - What the UI raises and what it is told

pub mod client;
mod engine;
pub mod intent;
pub mod state;

pub use client::{ChatClient, ClientError};
pub use intent::{Intent, Notice, SendOutcome, SkipReason, StreamKind};
pub use state::{ChatSnapshot, StreamStatus, SyncStatus};
