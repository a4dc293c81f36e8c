//! Daimon Sink - transport boundary to the remote Daimon service

pub mod http;
pub mod sink;

pub use http::HttpSink;
pub use sink::{RemoteClassifier, RemoteSink, SinkError, SinkResult};
