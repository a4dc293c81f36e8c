//! Daimon Gateway - HTTP service answering quick-checks and receiving heartbeats

pub mod routes;
pub mod server;

pub use routes::{router, GatewayState};
pub use server::{serve, start_gateway};
