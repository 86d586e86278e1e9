//! Test utilities for the curio metadata-fetch subsystem
//!
//! This crate provides mock transports and fixture payloads for testing
//! fetcher behavior without touching the network.

pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use mocks::{MockHttpClient, RecordedRequest, ScriptedConnector, ScriptedTransport};
