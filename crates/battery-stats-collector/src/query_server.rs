use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use battery_stats::FsProvider;
use log::{debug, error, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::{lock_core, BatteryStatsCollector, SharedCore};

const OK: &str = "HTTP/1.1 200 OK\r\n";
const UNAVAILABLE: &str = "HTTP/1.1 503 Service Unavailable\r\n";
const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\n";
const SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\n";

const TEXT: &str = "text/plain";
const JSON: &str = "application/json";

/// Status line, content type and body for `path`.
///
/// Routes: `/live`, `/ready` (503 until the first CPU refresh), `/stats`
/// (freshly computed rows as JSON) and `/dump` (text dump).
pub(crate) fn respond<P: FsProvider>(
    path: &str,
    this: &BatteryStatsCollector,
    core: &SharedCore<P>,
) -> (&'static str, &'static str, String) {
    match path {
        "/live" => (OK, TEXT, "live".to_string()),
        "/ready" => {
            if this.ready() {
                (OK, TEXT, "ready".to_string())
            } else {
                (UNAVAILABLE, TEXT, "not ready".to_string())
            }
        }
        "/stats" => {
            let rows = lock_core(core).battery_stats();
            match serde_json::to_string(&rows) {
                Ok(body) => (OK, JSON, body),
                Err(e) => {
                    error!("Failed to encode stats: {}", e);
                    (SERVER_ERROR, TEXT, "encode error".to_string())
                }
            }
        }
        "/dump" => (OK, TEXT, lock_core(core).dump_info()),
        _ => (NOT_FOUND, TEXT, "not found".to_string()),
    }
}

async fn handle_connection<P: FsProvider>(
    mut stream: TcpStream,
    this: Arc<BatteryStatsCollector>,
    core: SharedCore<P>,
) -> Result<()> {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let req = String::from_utf8_lossy(&buf[..n]);

    // METHOD PATH HTTP/1.1
    let mut path = "/";
    if let Some(line) = req.lines().next() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            path = parts[1];
        }
    }

    let (status_line, content_type, body) = respond(path, &this, &core);

    let headers = format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line,
        content_type,
        body.len()
    );
    if let Err(e) = stream.write_all(headers.as_bytes()).await {
        error!("Failed to write HTTP headers: {}", e);
        return Ok(());
    }
    if let Err(e) = stream.write_all(body.as_bytes()).await {
        error!("Failed to write HTTP body: {}", e);
    }
    if let Err(e) = stream.shutdown().await {
        debug!("Failed to shut down query connection: {}", e);
    }
    Ok(())
}

pub async fn run<P: FsProvider + Send + 'static>(
    addr: String,
    this: Arc<BatteryStatsCollector>,
    core: SharedCore<P>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Query server listening on {}", addr);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Query server shutting down");
                break;
            }
            accept_res = listener.accept() => {
                match accept_res {
                    Ok((stream, peer)) => {
                        let this = this.clone();
                        let core = core.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, this, core).await {
                                debug!("Query connection from {} failed: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Query server accept error: {}", e);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Sandbox;
    use battery_stats::{ManualClock, StatsEvent, StatsState, StatsType};

    #[test]
    fn test_routes() -> anyhow::Result<()> {
        let sb = Sandbox::new()?;
        let clock = Arc::new(ManualClock::new());
        let core = sb.core(&clock)?;
        let this = BatteryStatsCollector::new();

        assert_eq!(respond("/live", &this, &core).0, OK);
        assert_eq!(respond("/ready", &this, &core).0, UNAVAILABLE);
        assert_eq!(respond("/nope", &this, &core).0, NOT_FOUND);

        {
            let mut c = lock_core(&core);
            c.set_on_battery(true);
            c.update_stats(StatsEvent::state(
                StatsType::GpsOn,
                StatsState::Activated,
                10_000,
            ));
        }
        clock.advance(100_000);

        let (status, content_type, body) = respond("/stats", &this, &core);
        assert_eq!(status, OK);
        assert_eq!(content_type, JSON);
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        let app = rows
            .iter()
            .find(|r| r["uid"] == 10_000 && r["consumption_type"] == "APP");
        assert!(app.is_some());

        let (status, _, dump) = respond("/dump", &this, &core);
        assert_eq!(status, OK);
        assert!(dump.starts_with("BATTERY STATS DUMP:"));
        Ok(())
    }

    #[tokio::test]
    async fn test_serves_over_tcp() -> anyhow::Result<()> {
        let sb = Sandbox::new()?;
        let clock = Arc::new(ManualClock::new());
        let core = sb.core(&clock)?;
        let this = BatteryStatsCollector::new();
        let shutdown = CancellationToken::new();

        // reserve a free port, then hand it to the server
        let reserved = TcpListener::bind("127.0.0.1:0").await?;
        let addr = reserved.local_addr()?;
        drop(reserved);
        let jh = tokio::spawn(run(addr.to_string(), this, core, shutdown.clone()));

        let mut stream = loop {
            match TcpStream::connect(addr).await {
                Ok(s) => break s,
                Err(_) => tokio::task::yield_now().await,
            }
        };
        stream.write_all(b"GET /live HTTP/1.1\r\n\r\n").await?;
        let mut resp = String::new();
        stream.read_to_string(&mut resp).await?;
        assert!(resp.starts_with(OK));
        assert!(resp.ends_with("live"));

        shutdown.cancel();
        jh.await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_keeps_serving_after_dropped_client() -> anyhow::Result<()> {
        let sb = Sandbox::new()?;
        let clock = Arc::new(ManualClock::new());
        let core = sb.core(&clock)?;
        let this = BatteryStatsCollector::new();
        let shutdown = CancellationToken::new();

        let reserved = TcpListener::bind("127.0.0.1:0").await?;
        let addr = reserved.local_addr()?;
        drop(reserved);
        let jh = tokio::spawn(run(addr.to_string(), this, core, shutdown.clone()));

        // a client that hangs up without sending a request
        let early = loop {
            match TcpStream::connect(addr).await {
                Ok(s) => break s,
                Err(_) => tokio::task::yield_now().await,
            }
        };
        drop(early);

        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(b"GET /ready HTTP/1.1\r\n\r\n").await?;
        let mut resp = String::new();
        stream.read_to_string(&mut resp).await?;
        assert!(resp.starts_with(UNAVAILABLE));
        assert!(resp.ends_with("not ready"));

        shutdown.cancel();
        jh.await??;
        Ok(())
    }
}
