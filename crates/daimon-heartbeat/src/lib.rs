//! Daimon Heartbeat - local risk classification and heartbeat aggregation
//!
//! Two paths share this crate:
//! - Interactive: `RiskClassifier` scores a prompt or command locally, then
//!   `EmergencePolicy` decides whether it is worth a bounded remote check and
//!   whether to interrupt the user. Any remote failure resolves to silence.
//! - Background: `Aggregator` buffers heartbeats and hands flushed batches,
//!   annotated with patterns, to a single `DeliveryWorker` task.

pub mod aggregator;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod emergence;
pub mod hooks;
pub mod patterns;

pub use aggregator::{Aggregator, DeliveryStats, DeliveryWorker, FlushReason};
pub use classifier::RiskClassifier;
pub use collector::{record_lines, CollectStats};
pub use config::DaimonConfig;
pub use emergence::{EmergenceDecision, EmergencePolicy, RemoteCheck};
pub use patterns::detect_patterns;
