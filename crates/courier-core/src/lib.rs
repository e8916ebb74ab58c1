//! # Courier Core
//!
//! Shared vocabulary for the Courier engine: the error type, configuration,
//! payload envelopes, and the traits every pipeline stage plugs in through.
//!
//! ```text
//! Producer ──add──▶ Schedule ──next──▶ ContentSource ──▶ Notifier
//!                      ▲                                    │
//!                      └────────────── feedback ────────────┘
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{CourierError, Result};
pub use types::{Payload, Recipient, Requested};
