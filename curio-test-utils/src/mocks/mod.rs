//! Mock implementations of the core's transport seams

mod http;
mod lineproto;

pub use http::{MockHttpClient, RecordedRequest};
pub use lineproto::{ScriptedConnector, ScriptedTransport};
