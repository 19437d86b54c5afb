//! Response envelopes and draw targets for the Aether framework.
//!
//! This crate provides:
//! - `ResponseEnvelope` - Text, JSON or XML output with a uniform `draw`/`get` contract
//! - `DrawTarget` - Where envelopes write their headers and body
//! - `ResponseSink` - Buffered draw target that tracks whether headers went out
//! - `to_xml` - Element-tree serialization of nested maps and sequences
//!
//! # Example
//!
//! ```ignore
//! use aether_response::{ResponseEnvelope, ResponseSink};
//!
//! let mut sink = ResponseSink::new();
//! ResponseEnvelope::json(serde_json::json!({"ok": true})).draw(&mut sink)?;
//! let response = sink.into_response();
//! ```

mod envelope;
mod sink;
mod xml;

pub use envelope::*;
pub use sink::*;
pub use xml::*;
