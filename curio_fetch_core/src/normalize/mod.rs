//! Response normalization strategies
//!
//! Three strategies turn raw payloads into entry fields: dotted-path access
//! into JSON documents, pattern extraction from semi-structured HTML, and
//! the transform pipeline in [`crate::transform`] for XML sources. Shared
//! vocabulary mappings (age ratings) live here too so every source
//! normalizes to the same canonical strings.

pub mod html;
pub mod json;
pub mod vocab;

pub use json::{map_value, map_value_path};
