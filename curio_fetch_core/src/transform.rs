//! Stylesheet transform seam for XML sources
//!
//! XML sources are normalized by transforming the service's response into
//! the canonical collection XML understood by [`crate::importer`]. The
//! transform engine itself is opaque behind [`XsltPipeline`]; the host
//! application supplies one bound to the stylesheet configured for the
//! source, and tests substitute a closure.

use crate::error::Result;

/// Opaque stylesheet transform from source XML to canonical collection XML
pub trait XsltPipeline: Send + Sync {
    fn transform(&self, source_xml: &str) -> Result<String>;
}

/// Pass-through pipeline for sources that already speak canonical XML
pub struct IdentityPipeline;

impl XsltPipeline for IdentityPipeline {
    fn transform(&self, source_xml: &str) -> Result<String> {
        Ok(source_xml.to_string())
    }
}

/// Closure-backed pipeline, mostly useful in tests
pub struct FnPipeline<F>(pub F);

impl<F> XsltPipeline for FnPipeline<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn transform(&self, source_xml: &str) -> Result<String> {
        (self.0)(source_xml)
    }
}
