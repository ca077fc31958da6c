//! HTTP transport shared by every transaction task that talks to the
//! MMSC. One `reqwest::Client` is built per `Connection`, bound to its
//! resolved local address and proxy.

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::SimSettings;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transfer::{TransferKind, TransferList};

pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Builds a client bound to `conn`'s local address and proxy, with no
/// connection pooling across bearers.
fn build_client(conn: &Connection, user_agent: &str) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .connection_verbose(false)
        .pool_max_idle_per_host(0);

    if let Some(addr) = conn.local_address {
        builder = builder.local_address(addr);
    }

    if !conn.mmsproxy.is_empty() {
        let proxy_host = conn.normalised_proxy_host();
        let proxy_url = format!("http://{proxy_host}");
        builder = builder.proxy(reqwest::Proxy::http(&proxy_url).map_err(Error::Transport)?);
    } else {
        builder = builder.no_proxy();
    }

    builder.build().map_err(Error::Transport)
}

/// POSTs `body` with MMS's conventional content-type and headers,
/// reporting progress through `transfers`. The caller is responsible
/// for bounding this by the task's deadline.
pub async fn post(
    conn: &Connection,
    url: &str,
    body: Vec<u8>,
    sim: &SimSettings,
    transfers: &dyn TransferList,
    transfer_id: &str,
) -> Result<HttpResponse> {
    let client = build_client(conn, &sim.user_agent)?;
    let total = body.len() as u64;
    transfers.transfer_started(transfer_id, TransferKind::Send);
    transfers.send_progress(transfer_id, TransferKind::Send, 0, total);

    let mut req = client
        .post(url)
        .header("Connection", "close")
        .header("Content-Type", "application/vnd.wap.mms-message")
        .body(body);
    if let Some(uaprof) = &sim.uaprof {
        req = req.header("x-wap-profile", uaprof.clone());
    }

    let resp = req.send().await.map_err(Error::Transport)?;
    let status = resp.status().as_u16();
    transfers.send_progress(transfer_id, TransferKind::Send, total, total);
    let bytes = resp.bytes().await.map_err(Error::Transport)?;
    transfers.transfer_finished(transfer_id, TransferKind::Send);

    if !(200..300).contains(&status) {
        return Err(Error::PermanentHttp { status });
    }
    Ok(HttpResponse { status, body: bytes.to_vec() })
}

/// GETs the notification's content-location.
pub async fn get(
    conn: &Connection,
    url: &str,
    sim: &SimSettings,
    transfers: &dyn TransferList,
    transfer_id: &str,
) -> Result<HttpResponse> {
    let client = build_client(conn, &sim.user_agent)?;
    transfers.transfer_started(transfer_id, TransferKind::Retrieve);
    transfers.receive_progress(transfer_id, TransferKind::Retrieve, 0, 0);

    let mut req = client.get(url).header("Connection", "close");
    if let Some(uaprof) = &sim.uaprof {
        req = req.header("x-wap-profile", uaprof.clone());
    }

    let resp = req.send().await.map_err(Error::Transport)?;
    let status = resp.status().as_u16();
    let total = resp.content_length().unwrap_or(0);
    let bytes = resp.bytes().await.map_err(Error::Transport)?;
    transfers.receive_progress(transfer_id, TransferKind::Retrieve, bytes.len() as u64, total);
    transfers.transfer_finished(transfer_id, TransferKind::Retrieve);

    if !(200..300).contains(&status) {
        return Err(Error::PermanentHttp { status });
    }
    Ok(HttpResponse { status, body: bytes.to_vec() })
}

/// Remaining time until `deadline`, or `Duration::ZERO` if already past.
pub fn time_remaining(deadline: std::time::Instant) -> Duration {
    deadline.saturating_duration_since(std::time::Instant::now())
}

/// Used by tests and the CLI's in-memory `ConnMan` stand-in to avoid
/// resolving a real address.
pub fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}
