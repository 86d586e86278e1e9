//! Image store collaborator
//!
//! Cover art is handed to the host application's image store, which returns
//! an opaque local identifier stored in the entry's image field. Failures
//! degrade to an empty id so a missing cover never fails a fetch.

use async_trait::async_trait;
use url::Url;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Download and store the image, returning its local id.
    ///
    /// Returns an empty string when the image cannot be fetched or stored.
    async fn store(&self, url: &Url) -> String;
}

/// Store that keeps nothing; every cover resolves to no image.
pub struct NullImageStore;

#[async_trait]
impl ImageStore for NullImageStore {
    async fn store(&self, _url: &Url) -> String {
        String::new()
    }
}
