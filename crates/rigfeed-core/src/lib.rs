//! # rigfeed-core
//!
//! Foundation types for the rigfeed telemetry relay.
//!
//! This crate provides the shared vocabulary the other rigfeed crates depend on:
//!
//! - **Values**: [`value::TelemetryValue`] — the tagged union carried by every
//!   channel update and event attribute, with a lossless mapping to JSON
//! - **Channel keys**: [`channel::channel_key`] — `name` / `name[index]`
//!   formatting for indexed channels
//! - **Events**: [`event::NamedEvent`] and [`event::EventClass`] — discrete
//!   producer events, split into persistent configuration events and one-shot
//!   gameplay events
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other rigfeed crates.

#![deny(unsafe_code)]

pub mod channel;
pub mod event;
pub mod value;

pub use channel::channel_key;
pub use event::{EventClass, NamedEvent};
pub use value::TelemetryValue;
