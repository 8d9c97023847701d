//! patchy JACK - Port registry backed by a JACK client.
//!
//! This crate is the only place that talks to the JACK server. It exposes the
//! server's ports and connections through [`patchy_core::PortRegistry`].

pub mod error;
pub mod registry;

pub use error::{JackError, JackResult};
pub use registry::{CLIENT_NAME, JackRegistry};
