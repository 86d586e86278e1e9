//! Curio Metadata-Fetch Core Library
//!
//! This is the core library for curio's metadata-fetch subsystem, providing
//! the per-source fetchers, response normalization, credential handling,
//! reference-data caching, and rate limiting shared by every data source.

pub mod config;
pub mod credentials;
pub mod entry;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod http;
pub mod images;
pub mod importer;
pub mod lineproto;
pub mod manager;
pub mod normalize;
pub mod ratelimit;
pub mod refcache;
pub mod request;
pub mod transform;

// The shared mocks in ../curio-test-utils name this crate by its package
// name. Depending on that crate from here would be a dev-dependency cycle,
// which makes the unit-test build link a second copy of this library and
// its trait impls stop unifying with ours. Instead the mock sources are
// compiled straight into the test build, with a self-alias so their
// `curio_fetch_core::` paths resolve to this very build.
#[cfg(test)]
extern crate self as curio_fetch_core;

#[cfg(test)]
#[path = "../../curio-test-utils/src/lib.rs"]
mod curio_test_utils;

// Re-export main types
pub use entry::{Collection, Entry, Field, FieldKind};
pub use error::{FetchError, Result};
pub use event::{EventReceiver, EventSender, FetchEvent, FetchResult, Severity};
pub use fetcher::Fetcher;
pub use manager::FetchManager;
pub use request::{CollectionKind, FetchKey, FetchRequest};
