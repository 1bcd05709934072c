// Adapters layer: concrete implementations of the domain ports (HTTP transport, pacing, roster files).

pub mod http;
pub mod pacer;
pub mod roster;

pub use http::ReqwestTransport;
pub use pacer::{FixedDelayPacer, NoPacer, TokenBucketPacer};
pub use roster::CsvRoster;
