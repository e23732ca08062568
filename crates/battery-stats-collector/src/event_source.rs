//! Line-delimited JSON event intake.
//!
//! Each non-empty line is one serialized `StatsEvent`. Malformed lines are
//! logged and skipped; the stream ends at EOF or on shutdown.

use anyhow::Result;
use battery_stats::StatsEvent;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> serde_json::Result<Option<StatsEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Forward events read from `reader` to the collector.
pub async fn run<R: AsyncRead + Unpin>(
    reader: R,
    tx: mpsc::Sender<StatsEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0u64;
    let mut rejected = 0u64;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break;
            }
            next = lines.next_line() => {
                let Some(line) = next? else {
                    debug!("event input reached EOF after {} lines", line_no);
                    break;
                };
                line_no += 1;
                match parse_line(&line) {
                    Ok(Some(ev)) => {
                        if tx.send(ev).await.is_err() {
                            debug!("collector gone, stopping event input");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        rejected += 1;
                        warn!("skipping event line {}: {}", line_no, e);
                    }
                }
            }
        }
    }

    if rejected > 0 {
        info!("event input rejected {} of {} lines", rejected, line_no);
    }
    Ok(())
}
