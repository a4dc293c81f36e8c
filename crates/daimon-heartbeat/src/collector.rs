//! Newline-delimited heartbeat input for `daimon collect`

use crate::aggregator::Aggregator;
use daimon_core::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Line counts from one input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub recorded: u64,
    pub skipped: u64,
}

/// Record every well-formed heartbeat line from `reader` until EOF.
///
/// Lines that are not UTF-8, not JSON, or carry an empty payload are skipped.
/// A read error ends the stream early; whatever was recorded stays pending
/// so the caller can still flush it.
pub async fn record_lines<R>(mut reader: R, aggregator: &Aggregator) -> CollectStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = CollectStats::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Heartbeat input ended early: {}", e);
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                stats.skipped += 1;
                debug!("Skipping non-UTF-8 heartbeat line: {}", e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match Event::from_json_line(line) {
            Ok(event) => {
                stats.recorded += 1;
                if let Some(reason) = aggregator.record(event) {
                    debug!("Flushed: {:?}", reason);
                }
            }
            Err(e) => {
                stats.skipped += 1;
                debug!("Skipping heartbeat line: {}", e);
            }
        }
    }
    stats
}
