//! Line-oriented catalog protocol
//!
//! Library catalogs are reached over a raw TCP session speaking a simple
//! line protocol: three-digit status lines for command replies and
//! tag/value record blocks for search results. The exchange is
//!
//! ```text
//! S: 220 catalog ready
//! C: LOGIN reader secret
//! S: 230 welcome
//! C: FIND TI firefly
//! S: 210 12
//! C: SHOW 0 5
//! S: TI Firefly
//! S: AU Whedon, Joss
//! S:
//! S: ...
//! S: .
//! C: QUIT
//! ```
//!
//! A `530` reply to LOGIN means the credentials were rejected; the fetcher
//! re-prompts once and retries.

pub mod codec;
pub mod connection;

pub use codec::{Record, StatusLine, parse_records, parse_status};
pub use connection::{LineConnector, LineTransport, OpacConnection, TcpConnector};
